//! Story extractor for news listing markup
//!
//! This module parses a listing page and pulls one record per story row:
//! - Story id (from the row's `id` attribute)
//! - Rank (the "1." style ordinal shown next to the title)
//! - Score (looked up elsewhere in the document by element id)
//! - Title (the story link text)
//!
//! Listing markup is treated as hostile: any field may be absent and the
//! row is still emitted with that field defaulted.

use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use thiserror::Error;

/// Score assigned to stories whose score element is missing or empty
pub const DEFAULT_SCORE: &str = "0 points";

/// Selector matching one story row in the listing table
const ROW_SELECTOR: &str = "tr.athing";

/// Selector for the rank ordinal inside a story row
const RANK_SELECTOR: &str = "span";

/// Selector for the story link inside a story row
const TITLE_SELECTOR: &str = ".storylink";

/// Selector matching every score element in the document
const SCORE_SELECTOR: &str = r#"[id^="score_"]"#;

/// Prefix that ties a score element id back to its story id
const SCORE_ID_PREFIX: &str = "score_";

/// Extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no story rows found in page markup")]
    NoListingRows,
}

/// A single story record extracted from a listing page
///
/// All fields are kept as the source text, untyped. A missing score becomes
/// [`DEFAULT_SCORE`]; other missing fields become empty strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Story {
    /// Site-assigned story id
    pub id: String,

    /// Position on the listing page, e.g. "1."
    pub rank: String,

    /// Vote count text, e.g. "502 points"
    pub score: String,

    /// Story headline
    pub title: String,
}

/// Extracts story records from listing page markup
///
/// Each `tr.athing` row yields exactly one [`Story`]. Scores live outside
/// the story rows, so they are collected document-wide first and joined to
/// rows by story id. A row missing its score, rank, or title is still
/// emitted with defaults; only a page with no story rows at all is an error.
///
/// # Arguments
///
/// * `html` - The listing page markup
///
/// # Returns
///
/// * `Ok(Vec<Story>)` - One record per story row, in document order
/// * `Err(ExtractError::NoListingRows)` - The markup contains no story rows
///
/// # Example
///
/// ```no_run
/// use newsrake::harvest::extract_stories;
///
/// let html = r#"
///     <table id="hnmain">
///     <tr class="athing" id="100"><td><span class="rank">1.</span></td>
///         <td><a class="storylink" href="x">Hello</a></td></tr>
///     <tr><td class="subtext"><span id="score_100">7 points</span></td></tr>
///     </table>
/// "#;
/// let stories = extract_stories(html).unwrap();
/// assert_eq!(stories[0].id, "100");
/// assert_eq!(stories[0].score, "7 points");
/// ```
pub fn extract_stories(html: &str) -> Result<Vec<Story>, ExtractError> {
    let document = Html::parse_document(html);

    // Scores first: they live in sibling rows, keyed by "score_<id>"
    let scores = collect_scores(&document);

    let mut stories = Vec::new();

    if let Ok(row_selector) = Selector::parse(ROW_SELECTOR) {
        for row in document.select(&row_selector) {
            stories.push(assemble_story(&row, &scores));
        }
    }

    if stories.is_empty() {
        return Err(ExtractError::NoListingRows);
    }

    Ok(stories)
}

/// Collects every score element in the document, keyed by story id
fn collect_scores(document: &Html) -> HashMap<String, String> {
    let mut scores = HashMap::new();

    if let Ok(score_selector) = Selector::parse(SCORE_SELECTOR) {
        for element in document.select(&score_selector) {
            let Some(id) = element.value().attr("id") else {
                continue;
            };
            let Some(story_id) = id.strip_prefix(SCORE_ID_PREFIX) else {
                continue;
            };
            if story_id.is_empty() {
                continue;
            }

            let text = element.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                scores.insert(story_id.to_string(), text);
            }
        }
    }

    scores
}

/// Builds one story record from a row, defaulting whatever is missing
fn assemble_story(row: &ElementRef, scores: &HashMap<String, String>) -> Story {
    let id = row.value().attr("id").unwrap_or_default().to_string();

    let rank = first_text(row, RANK_SELECTOR).unwrap_or_default();

    let score = scores
        .get(&id)
        .cloned()
        .unwrap_or_else(|| DEFAULT_SCORE.to_string());

    let title = first_text(row, TITLE_SELECTOR).unwrap_or_default();

    Story {
        id,
        rank,
        score,
        title,
    }
}

/// Text of the first descendant matching the selector, if any
fn first_text(row: &ElementRef, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    row.select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(rows: &str) -> String {
        format!(
            r#"<html><head><title>News</title></head><body>
            <center><table id="hnmain"><tr><td>
            <table class="itemlist">{}</table>
            </td></tr></table></center>
            </body></html>"#,
            rows
        )
    }

    #[test]
    fn test_extract_full_row() {
        let html = listing(
            r#"
            <tr class="athing" id="16308961">
                <td align="right" valign="top" class="title"><span class="rank">1.</span></td>
                <td class="title"><a href="https://example.com/article" class="storylink">U.S. consumer protection official puts Equifax probe on ice</a></td>
            </tr>
            <tr><td colspan="2"></td><td class="subtext">
                <span class="score" id="score_16308961">502 points</span>
            </td></tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, "16308961");
        assert_eq!(stories[0].rank, "1.");
        assert_eq!(stories[0].score, "502 points");
        assert_eq!(
            stories[0].title,
            "U.S. consumer protection official puts Equifax probe on ice"
        );
    }

    #[test]
    fn test_missing_score_defaults() {
        // Job postings have a story row but no score element
        let html = listing(
            r#"
            <tr class="athing" id="16310002">
                <td class="title"><span class="rank">2.</span></td>
                <td class="title"><a href="x" class="storylink">Acme is hiring engineers</a></td>
            </tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].score, DEFAULT_SCORE);
        assert_eq!(stories[0].title, "Acme is hiring engineers");
    }

    #[test]
    fn test_empty_score_element_defaults() {
        let html = listing(
            r#"
            <tr class="athing" id="42">
                <td class="title"><span class="rank">1.</span></td>
                <td class="title"><a href="x" class="storylink">Title</a></td>
            </tr>
            <tr><td class="subtext"><span id="score_42"></span></td></tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories[0].score, DEFAULT_SCORE);
    }

    #[test]
    fn test_missing_title_still_emits_row() {
        let html = listing(
            r#"
            <tr class="athing" id="77">
                <td class="title"><span class="rank">3.</span></td>
            </tr>
            <tr><td class="subtext"><span id="score_77">12 points</span></td></tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, "77");
        assert_eq!(stories[0].rank, "3.");
        assert_eq!(stories[0].score, "12 points");
        assert_eq!(stories[0].title, "");
    }

    #[test]
    fn test_missing_rank_keeps_other_fields() {
        let html = listing(
            r#"
            <tr class="athing" id="88">
                <td class="title"><a href="x" class="storylink">No rank here</a></td>
            </tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].rank, "");
        assert_eq!(stories[0].title, "No rank here");
    }

    #[test]
    fn test_row_without_id_still_emits() {
        let html = listing(
            r#"
            <tr class="athing">
                <td class="title"><span class="rank">9.</span></td>
                <td class="title"><a href="x" class="storylink">Anonymous row</a></td>
            </tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[0].id, "");
        assert_eq!(stories[0].score, DEFAULT_SCORE);
    }

    #[test]
    fn test_one_bad_row_does_not_drop_the_rest() {
        let html = listing(
            r#"
            <tr class="athing" id="1"><td class="title"><span class="rank">1.</span></td>
                <td class="title"><a href="x" class="storylink">First</a></td></tr>
            <tr class="athing" id="2"></tr>
            <tr class="athing" id="3"><td class="title"><span class="rank">3.</span></td>
                <td class="title"><a href="x" class="storylink">Third</a></td></tr>
            <tr><td class="subtext"><span id="score_1">10 points</span></td></tr>
            <tr><td class="subtext"><span id="score_3">30 points</span></td></tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        assert_eq!(stories.len(), 3);
        assert_eq!(stories[0].title, "First");
        assert_eq!(stories[1].id, "2");
        assert_eq!(stories[1].title, "");
        assert_eq!(stories[2].title, "Third");
        assert_eq!(stories[2].score, "30 points");
    }

    #[test]
    fn test_no_rows_is_an_error() {
        let html = r#"<html><body><p>Sorry, we're down for maintenance.</p></body></html>"#;

        let result = extract_stories(html);
        assert!(matches!(result, Err(ExtractError::NoListingRows)));
    }

    #[test]
    fn test_garbage_input_is_rejected() {
        let inputs = [
            "",
            "\0\0\0\0",
            "<<<]]] not markup at all >>>",
            "<table><tr><td>rows but none of them stories</td></tr></table>",
        ];

        for html in inputs {
            let result = extract_stories(html);
            assert!(matches!(result, Err(ExtractError::NoListingRows)));
        }
    }

    #[test]
    fn test_rows_in_document_order() {
        let html = listing(
            r#"
            <tr class="athing" id="a"><td><span class="rank">1.</span></td>
                <td><a href="x" class="storylink">Alpha</a></td></tr>
            <tr class="athing" id="b"><td><span class="rank">2.</span></td>
                <td><a href="x" class="storylink">Beta</a></td></tr>
            <tr class="athing" id="c"><td><span class="rank">3.</span></td>
                <td><a href="x" class="storylink">Gamma</a></td></tr>
            "#,
        );

        let stories = extract_stories(&html).unwrap();
        let titles: Vec<&str> = stories.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let html = listing(
            r#"
            <tr class="athing" id="5"><td><span class="rank">1.</span></td>
                <td><a href="x" class="storylink">Same every time</a></td></tr>
            <tr><td class="subtext"><span id="score_5">5 points</span></td></tr>
            "#,
        );

        let first = extract_stories(&html).unwrap();
        let second = extract_stories(&html).unwrap();
        assert_eq!(first, second);
    }
}
