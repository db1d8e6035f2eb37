//! Pre-run cost estimate for an extraction.
//!
//! Token counts are fixed per-page guesses, not measurements: a page image
//! at the default scale costs roughly 85 prompt tokens on the vision side,
//! the extraction instruction about 200 more, and a page's worth of question
//! JSON around 500 completion tokens. The total is doubled to stay on the
//! conservative side of what a run actually bills.

use crate::catalog::ModelPricing;

/// Image tokens per page.
pub const IMAGE_TOKENS_PER_PAGE: u64 = 85;
/// Instruction tokens per page.
pub const INSTRUCTION_TOKENS_PER_PAGE: u64 = 200;
/// Prompt tokens per page.
pub const PROMPT_TOKENS_PER_PAGE: u64 = IMAGE_TOKENS_PER_PAGE + INSTRUCTION_TOKENS_PER_PAGE;
/// Completion tokens per page.
pub const COMPLETION_TOKENS_PER_PAGE: u64 = 500;
/// Safety multiplier over the single-pass figure.
pub const PASS_MULTIPLIER: f64 = 2.0;

/// Estimated USD cost of extracting `page_count` pages.
///
/// Returns 0 when pricing is unknown or incomplete; callers hide the figure
/// in that case.
pub fn estimate(page_count: usize, pricing: Option<&ModelPricing>) -> f64 {
    let Some((prompt, completion)) = pricing.and_then(|p| Some((p.prompt?, p.completion?))) else {
        return 0.0;
    };
    let per_page = (prompt / 1000.0) * PROMPT_TOKENS_PER_PAGE as f64
        + (completion / 1000.0) * COMPLETION_TOKENS_PER_PAGE as f64;
    per_page * PASS_MULTIPLIER * page_count as f64
}

/// `$0.1143` style display with four decimals.
pub fn format_cost(usd: f64) -> String {
    format!("${:.4}", usd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt4o_ten_pages() {
        let pricing = ModelPricing::per_thousand(0.0025, 0.01);
        let cost = estimate(10, Some(&pricing));
        // (0.0025 * 0.285 + 0.01 * 0.5) * 2 * 10
        assert!((cost - 0.11425).abs() < 1e-9, "got {cost}");
        assert_eq!(format_cost(0.1), "$0.1000");
        assert_eq!(format_cost(1.23456), "$1.2346");
    }

    #[test]
    fn grows_with_page_count() {
        let pricing = ModelPricing::per_thousand(0.003, 0.015);
        for n in 0..20 {
            assert!(estimate(n + 1, Some(&pricing)) > estimate(n, Some(&pricing)));
        }
    }

    #[test]
    fn missing_pricing_is_zero() {
        assert_eq!(estimate(10, None), 0.0);
        let partial = ModelPricing {
            prompt: Some(0.01),
            completion: None,
        };
        assert_eq!(estimate(10, Some(&partial)), 0.0);
        assert_eq!(estimate(0, Some(&ModelPricing::per_thousand(1.0, 1.0))), 0.0);
    }
}
