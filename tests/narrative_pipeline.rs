// Integration tests for the narrative bias pipeline.
//
// Runs extraction, batching, aggregation and scoring end to end against the
// character-level fake encoder from tests/common.

mod common;

use common::{doc, CharOracle};
use framelens::corpus::Document;
use framelens::narrative::aggregate::aggregate_by_document;
use framelens::narrative::{
    analyze_word, build_reference_anchors, extract_occurrences, AnalysisContext, AnchorSeeds,
    NarrativeParams, Pooling, ReferenceAnchors, WindowStrategy,
};

async fn anchors(oracle: &CharOracle) -> ReferenceAnchors {
    build_reference_anchors(oracle, &AnchorSeeds::default(), 32)
        .await
        .unwrap()
}

// ============================================================
// End-to-end scenarios
// ============================================================

#[tokio::test]
async fn single_document_single_occurrence() {
    let oracle = CharOracle::new();
    let anchors = anchors(&oracle).await;
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![doc("1", "真相很复杂")];

    let occurrences = extract_occurrences(&docs, "真相");
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].char_start, 0);
    assert_eq!(occurrences[0].char_end, 2);

    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].document_id, "1");
    assert_eq!(report.records[0].occurrences, 1);
    assert_eq!(report.stats.documents_matched, 1);
    assert_eq!(report.stats.documents_scored, 1);
    assert_eq!(report.stats.missing_embeddings, 0);
}

#[tokio::test]
async fn absent_word_produces_no_records() {
    let oracle = CharOracle::new();
    let anchors = anchors(&oracle).await;
    let calls_before = oracle.calls();
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![doc("1", "今天天气很好"), doc("2", "没有目标词")];
    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.stats.occurrences, 0);
    assert_eq!(report.stats.documents_matched, 0);
    assert_eq!(oracle.calls(), calls_before, "no encoder call for an absent word");
}

#[tokio::test]
async fn records_follow_document_order_and_stay_in_range() {
    let oracle = CharOracle::new();
    let anchors = anchors(&oracle).await;
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![
        doc("b", "我们相信真相，真相总会出现"),
        doc("skip", "无关内容"),
        doc("a", "社会制度下的真相"),
    ];
    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();

    let ids: Vec<&str> = report.records.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert_eq!(report.records[0].occurrences, 2);
    for r in &report.records {
        assert!((-1.0..=1.0).contains(&r.bias_score), "score {}", r.bias_score);
        assert_eq!(r.target_word, "真相");
    }
}

#[tokio::test]
async fn year_and_period_pass_through() {
    let oracle = CharOracle::new();
    let anchors = anchors(&oracle).await;
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![Document::new("7", "理解很难").with_year(2019).with_period("mid")];
    let report = analyze_word(&ctx, &docs, "理解").await.unwrap();

    assert_eq!(report.records[0].year, Some(2019));
    assert_eq!(report.records[0].period.as_deref(), Some("mid"));
}

// ============================================================
// Missing embeddings and failures
// ============================================================

#[tokio::test]
async fn truncated_target_counts_as_missing() {
    let oracle = CharOracle::new().with_max_seq_len(10);
    let anchors = anchors(&oracle).await;
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let text = format!("{}真相", "啊".repeat(20));
    let docs = vec![doc("1", &text), doc("2", "真相")];
    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();

    assert_eq!(report.stats.occurrences, 2);
    assert_eq!(report.stats.missing_embeddings, 1);
    assert_eq!(report.stats.documents_matched, 2);
    assert_eq!(report.stats.documents_dropped(), 1);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].document_id, "2");
}

#[tokio::test]
async fn encoder_failure_aborts_the_word() {
    let good = CharOracle::new();
    let anchors = anchors(&good).await;
    let failing = CharOracle::failing();
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &failing,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![doc("1", "真相很复杂")];
    assert!(analyze_word(&ctx, &docs, "真相").await.is_err());
}

#[tokio::test]
async fn untokenizable_target_skips_the_encoder() {
    let oracle = CharOracle::new().with_silent_word("真相");
    let anchors = anchors(&oracle).await;
    let calls_before = oracle.calls();
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![doc("1", "真相很复杂"), doc("2", "真相，还是真相")];
    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();

    assert!(report.records.is_empty());
    assert_eq!(report.stats.occurrences, 3);
    assert_eq!(report.stats.missing_embeddings, 3);
    assert_eq!(report.stats.documents_matched, 2);
    assert_eq!(report.stats.documents_dropped(), 2);
    assert_eq!(oracle.calls(), calls_before);
}

// ============================================================
// Batching
// ============================================================

#[tokio::test]
async fn occurrences_are_sent_in_configured_batches() {
    let oracle = CharOracle::new();
    let anchors = anchors(&oracle).await;
    let params = NarrativeParams {
        batch_size: 2,
        ..Default::default()
    };
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![doc("1", "真相真相真相"), doc("2", "真相"), doc("3", "真相")];
    let before = oracle.batch_sizes().len();
    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();

    assert_eq!(oracle.batch_sizes()[before..], [2, 2, 1]);
    assert_eq!(report.records.len(), 3);
}

#[tokio::test]
async fn encoder_batch_limit_caps_batch_size() {
    let oracle = CharOracle::new().with_max_batch(1);
    let anchors = build_reference_anchors(&oracle, &AnchorSeeds::default(), 32)
        .await
        .unwrap();
    let params = NarrativeParams::default();
    let ctx = AnalysisContext {
        oracle: &oracle,
        anchors: &anchors,
        params: &params,
    };

    let docs = vec![doc("1", "真相真相真相")];
    let before = oracle.batch_sizes().len();
    let report = analyze_word(&ctx, &docs, "真相").await.unwrap();

    assert_eq!(oracle.batch_sizes()[before..], [1, 1, 1]);
    assert_eq!(report.records.len(), 1);
}

// ============================================================
// Context modes
// ============================================================

#[tokio::test]
async fn sentence_window_and_context_pooling_score_documents() {
    let oracle = CharOracle::new();
    let anchors = anchors(&oracle).await;
    let docs = vec![doc("1", "前一句话。真相很复杂！后一句话")];

    for (window, pooling) in [
        (WindowStrategy::Sentence, Pooling::TargetSpan),
        (WindowStrategy::CharRadius(3), Pooling::Context),
        (WindowStrategy::Sentence, Pooling::Context),
    ] {
        let params = NarrativeParams {
            window,
            pooling,
            ..Default::default()
        };
        let ctx = AnalysisContext {
            oracle: &oracle,
            anchors: &anchors,
            params: &params,
        };
        let report = analyze_word(&ctx, &docs, "真相").await.unwrap();
        assert_eq!(report.records.len(), 1, "{window:?} / {pooling:?}");
    }
}

// ============================================================
// Aggregation
// ============================================================

#[test]
fn document_mean_is_order_invariant() {
    let docs = vec![doc("1", "真相A真相B真相")];
    let occ = extract_occurrences(&docs, "真相");
    assert_eq!(occ.len(), 3);

    let vectors = [vec![1.0, 0.0], vec![0.0, 1.0], vec![2.0, 2.0]];
    let forward: Vec<_> = occ.iter().copied().zip(vectors.iter().cloned()).collect();
    let mut reversed = forward.clone();
    reversed.reverse();

    let a = aggregate_by_document("真相", &forward);
    let b = aggregate_by_document("真相", &reversed);

    assert_eq!(a.len(), 1);
    assert_eq!(a[0].occurrence_count, 3);
    for (x, y) in a[0].vector.iter().zip(&b[0].vector) {
        assert!((x - y).abs() < 1e-12);
    }
    assert!((a[0].vector[0] - 1.0).abs() < 1e-12);
    assert!((a[0].vector[1] - 1.0).abs() < 1e-12);
}

// ============================================================
// Reference anchors
// ============================================================

#[tokio::test]
async fn anchors_are_deterministic() {
    let oracle = CharOracle::new();
    let first = anchors(&oracle).await;
    let second = anchors(&oracle).await;
    assert_eq!(first, second);
    assert_eq!(first.personal.seeds_used.len(), 10);
    assert!(first.personal.seeds_skipped.is_empty());
}

#[tokio::test]
async fn anchors_respect_encoder_batch_limit() {
    let oracle = CharOracle::new().with_max_batch(3);
    let anchors = build_reference_anchors(&oracle, &AnchorSeeds::default(), 32)
        .await
        .unwrap();
    assert!(oracle.batch_sizes().iter().all(|&n| n <= 3));
    assert_eq!(anchors.structural.seeds_used.len(), 10);
}

#[tokio::test]
async fn shared_seed_words_are_encoded_once() {
    let oracle = CharOracle::new();
    let seeds = AnchorSeeds {
        personal: vec!["我们".to_string(), "历史".to_string(), "个人".to_string()],
        structural: vec!["历史".to_string(), "社会".to_string(), "我们".to_string()],
    };

    let anchors = build_reference_anchors(&oracle, &seeds, 2).await.unwrap();

    assert_eq!(oracle.batch_sizes().iter().sum::<usize>(), 4);
    assert_eq!(oracle.batch_sizes(), vec![2, 2]);
    assert_eq!(anchors.personal.seeds_used, vec!["我们", "历史", "个人"]);
    assert_eq!(anchors.structural.seeds_used, vec!["历史", "社会", "我们"]);
}

#[tokio::test]
async fn pole_without_usable_seeds_is_an_error() {
    let oracle = CharOracle::new();
    let seeds = AnchorSeeds {
        personal: vec![String::new()],
        structural: vec!["社会".to_string()],
    };
    let err = build_reference_anchors(&oracle, &seeds, 32)
        .await
        .unwrap_err()
        .to_string();
    assert!(err.contains("personal"), "unexpected error: {err}");
}
