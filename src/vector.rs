// Dense vector helpers shared by the bias scorer and the topic aligner.
//
// Every embedding in the crate is a plain `Vec<f64>`. Encoder output arrives
// as f32 and is widened once at the oracle boundary so that the pooling and
// similarity math below runs in double precision.

/// Mean of a set of equally sized vectors.
///
/// Returns `None` for an empty input. The output has the dimension of the
/// first vector; extra trailing values in longer vectors are ignored and
/// shorter vectors contribute zeros for the positions they lack.
pub fn mean_vector<'a, I>(vectors: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut iter = vectors.into_iter();
    let first = iter.next()?;

    let mut sum = first.to_vec();
    let mut count = 1usize;

    for v in iter {
        for (acc, &val) in sum.iter_mut().zip(v.iter()) {
            *acc += val;
        }
        count += 1;
    }

    let n = count as f64;
    for val in &mut sum {
        *val /= n;
    }

    Some(sum)
}

/// Mean of the rows `rows[range]` of a hidden-state matrix.
///
/// Used to pool sub-token vectors into a single word vector.
pub fn mean_rows(rows: &[Vec<f64>], range: std::ops::Range<usize>) -> Option<Vec<f64>> {
    let slice = rows.get(range)?;
    mean_vector(slice.iter().map(|r| r.as_slice()))
}

/// Euclidean norm.
pub fn norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Zero-norm, empty or dimension-mismatched inputs give 0.0 rather than an
/// error or NaN.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (norm_a, norm_b) = (norm(a), norm(b));
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    // Divided one norm at a time so tiny vectors don't underflow the product.
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let cos = dot / norm_a / norm_b;
    if cos.is_finite() {
        cos.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
