// FrameLens: narrative framing analysis for Chinese-language corpora
//
// This is the library root. `narrative` scores how target words lean between
// personal and structural framing; `topics` aligns topic models of two
// periods. The encoder behind both embedding steps lives in `oracle`.

pub mod config;
pub mod corpus;
pub mod narrative;
pub mod oracle;
pub mod output;
pub mod topics;
pub mod vector;
