//! Flattens nested search responses into table rows
//!
//! document -> page -> highlight payloads become one `SearchResultRow` per
//! matched page. Row order is document order, then page order within each
//! document, exactly as the backend sent them.

use crate::types::{
    DocumentMatch, PageMatch, RawDocument, RawPage, RawSearchResponse, SearchMode,
    SearchResultRow,
};

/// Flatten a response into rows
pub fn normalize(response: &RawSearchResponse) -> Vec<SearchResultRow> {
    documents(response)
        .into_iter()
        .flat_map(|document| {
            let DocumentMatch {
                file_name,
                relative_path,
                total_pages,
                pages,
            } = document;

            pages.into_iter().map(move |page| SearchResultRow {
                row_id: file_name.clone(),
                document_name: file_name.clone(),
                content: page.highlight_text,
                page_number: page.page_number,
                total_pages,
                relative_path: relative_path.clone(),
            })
        })
        .collect()
}

/// Resolve defaults and highlight fields without flattening
pub fn documents(response: &RawSearchResponse) -> Vec<DocumentMatch> {
    response.results.iter().map(document_match).collect()
}

/// Number published to count subscribers for a completed search.
///
/// Exact searches report the backend-declared total when there is one;
/// everything else counts the rows actually shown.
pub fn result_count(mode: SearchMode, response: &RawSearchResponse, rows: &[SearchResultRow]) -> u64 {
    match (mode, response.declared_total()) {
        (SearchMode::Exact, Some(total)) => total,
        _ => rows.len() as u64,
    }
}

fn document_match(raw: &RawDocument) -> DocumentMatch {
    DocumentMatch {
        file_name: raw.filename.clone(),
        relative_path: raw.relative_path.clone().unwrap_or_default(),
        total_pages: raw.total_pages.filter(|pages| *pages >= 1).unwrap_or(1),
        pages: raw.matching_pages.iter().map(page_match).collect(),
    }
}

fn page_match(raw: &RawPage) -> PageMatch {
    // Highlights win when both are present; content is the fallback.
    let text = raw
        .highlights
        .as_ref()
        .filter(|highlights| !highlights.is_empty())
        .or(raw.content.as_ref())
        .map(|field| field.joined())
        .unwrap_or_default();

    PageMatch {
        page_number: raw.page_number.filter(|n| *n >= 1).unwrap_or(1),
        highlight_text: text,
    }
}
