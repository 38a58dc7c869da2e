/*!
 * Tests for segment batching
 */

use cuegate::subtitle_processor::Segment;
use cuegate::translation::batch::{BatchLimits, CharTokenEstimator, SizeEstimator, batch_segments, batch_with_limits};

use crate::common;

fn char_count(texts: &[&str]) -> usize {
    texts.iter().map(|t| t.chars().count()).sum()
}

/// Partition completeness across a grid of counts and limits
#[test]
fn test_batchSegments_withVariousLimits_shouldPartitionExactly() {
    for count in [0, 1, 2, 24, 25, 26, 81, 200] {
        let segments = common::make_segments(count);
        for max_count in [1, 3, 25, 100] {
            for max_tokens in [1, 40, 500, usize::MAX] {
                let batches = batch_segments(&segments, max_count, max_tokens, &char_count);

                let flattened: Vec<usize> = batches.iter().flat_map(|b| b.ids()).collect();
                let expected: Vec<usize> = (1..=count).collect();
                assert_eq!(flattened, expected, "count={count} max_count={max_count} max_tokens={max_tokens}");

                for batch in &batches {
                    assert!(!batch.is_empty());
                    assert!(batch.len() <= max_count);
                    if batch.estimated_size > max_tokens {
                        assert_eq!(batch.len(), 1, "only singletons may overflow");
                        assert!(batch.oversized);
                    }
                }
            }
        }
    }
}

#[test]
fn test_batchSegments_with81Segments_shouldSplit25_25_25_6() {
    let segments = common::make_segments(81);
    let batches = batch_segments(&segments, 25, 4500, &CharTokenEstimator::default());
    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![25, 25, 25, 6]);
}

#[test]
fn test_batchSegments_shouldBorrowInputSlices() {
    let segments = common::make_segments(5);
    let batches = batch_segments(&segments, 2, usize::MAX, &char_count);

    assert!(std::ptr::eq(&batches[0].segments[0], &segments[0]));
    assert!(std::ptr::eq(&batches[2].segments[0], &segments[4]));
}

#[test]
fn test_batchSegments_withEstimatorStruct_shouldUseIt() {
    struct Fixed(usize);
    impl SizeEstimator for Fixed {
        fn estimate(&self, texts: &[&str]) -> usize {
            texts.len() * self.0
        }
    }

    let segments = common::make_segments(10);
    let batches = batch_segments(&segments, 25, 30, &Fixed(10));

    assert_eq!(batches.len(), 4);
    assert_eq!(batches[0].len(), 3);
    assert_eq!(batches[0].estimated_size, 30);
}

#[test]
fn test_batchWithLimits_shouldHonorTokenBudget() {
    let long_text = "x".repeat(400);
    let segments: Vec<Segment> = (1..=6)
        .map(|i| Segment::new(i, long_text.as_str(), i as f64, i as f64 + 1.0))
        .collect();
    let limits = BatchLimits {
        max_segments_per_batch: 25,
        max_tokens_per_batch: 250,
    };

    // 400 chars = 100 tokens + 6 overhead per item: two items fit, three don't
    let batches = batch_with_limits(&segments, &limits, &CharTokenEstimator::default());

    let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![2, 2, 2]);
    assert!(batches.iter().all(|b| b.estimated_size == 212));
}
