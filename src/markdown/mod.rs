//! Best-effort parsers for markdown tables returned by the model
//!
//! The model is asked to answer directory searches with a markdown table,
//! but nothing guarantees strict formatting. These parsers are forgiving:
//! headers are matched case-insensitively by substring, rows that cannot
//! be resolved are dropped, and any input without the expected header
//! marker yields an empty result. Callers fall back to showing the raw
//! text when nothing parses. Parsing never fails and never panics.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{Lawyer, Notary};

static MARKDOWN_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link regex"));

/// A resolved link cell: display title plus the URL, if one could be found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub title: String,
    pub url: Option<String>,
}

/// Extract a link from a table cell.
///
/// Recognizes `[title](url)` markdown links first. A bare cell that looks
/// like a domain (contains a dot, no spaces) is treated as a URL, with
/// `https://` prepended when no scheme is given. Anything else has no
/// resolvable URL.
pub fn parse_link(text: &str) -> LinkTarget {
    if let Some(caps) = MARKDOWN_LINK.captures(text) {
        return LinkTarget {
            title: caps[1].to_string(),
            url: Some(caps[2].trim().to_string()),
        };
    }
    let trimmed = text.trim();
    if trimmed.contains('.') && !trimmed.contains(' ') {
        let url = if trimmed.starts_with("http") {
            trimmed.to_string()
        } else {
            format!("https://{}", trimmed)
        };
        return LinkTarget {
            title: trimmed.to_string(),
            url: Some(url),
        };
    }
    LinkTarget {
        title: trimmed.to_string(),
        url: None,
    }
}

/// Parse a percentage-or-number cell, defaulting to 0 on anything odd.
pub fn parse_score(cell: &str) -> u32 {
    cell.trim()
        .trim_end_matches('%')
        .trim()
        .parse::<u32>()
        .unwrap_or(0)
}

/// Split a table blob into trimmed cell rows. The first row is the header.
///
/// Returns `None` when the marker is absent or there is no data row at all.
fn table_rows(markdown: &str, marker: &str) -> Option<Vec<Vec<String>>> {
    let start = markdown.find(marker)?;
    let table = &markdown[start..];

    let rows: Vec<Vec<String>> = table
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('|') && line.ends_with('|'))
        // Separator rows (|---|---|) carry no data.
        .filter(|line| !line.contains("---"))
        .map(|line| {
            let mut cells: Vec<String> = line.split('|').map(|c| c.trim().to_string()).collect();
            // Drop the empty edge cells produced by the outer pipes.
            if !cells.is_empty() {
                cells.remove(0);
            }
            cells.pop();
            cells
        })
        .collect();

    if rows.len() < 2 {
        return None;
    }
    Some(rows)
}

/// Column positions for the lawyer table, resolved from the header row.
#[derive(Debug, Default)]
struct LawyerColumns {
    name: Option<usize>,
    specialty: Option<usize>,
    city: Option<usize>,
    address: Option<usize>,
    contact: Option<usize>,
    website: Option<usize>,
    experience: Option<usize>,
    relevance: Option<usize>,
}

impl LawyerColumns {
    fn resolve(headers: &[String]) -> Self {
        let mut cols = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let h = header.to_lowercase();
            if h.contains("name") {
                cols.name = Some(idx);
            }
            if h.contains("specialty") {
                cols.specialty = Some(idx);
            }
            if h.contains("city") {
                cols.city = Some(idx);
            }
            if h.contains("address") {
                cols.address = Some(idx);
            }
            if h.contains("contact") {
                cols.contact = Some(idx);
            }
            if h.contains("website") {
                cols.website = Some(idx);
            }
            if h.contains("experience") {
                cols.experience = Some(idx);
            }
            if h.contains("relevance") {
                cols.relevance = Some(idx);
            }
        }
        cols
    }
}

fn cell(row: &[String], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i))
        .cloned()
        .unwrap_or_default()
}

fn cell_or_na(row: &[String], idx: Option<usize>) -> String {
    let value = cell(row, idx);
    if value.is_empty() {
        "N/A".to_string()
    } else {
        value
    }
}

/// Parse a lawyer listing table out of a model response.
///
/// The header row must contain `| Name`; rows without a resolvable name and
/// website are dropped. Output preserves input row order.
pub fn parse_lawyer_table(markdown: &str) -> Vec<Lawyer> {
    let Some(rows) = table_rows(markdown, "| Name") else {
        tracing::debug!("no lawyer table header found in response");
        return Vec::new();
    };

    let cols = LawyerColumns::resolve(&rows[0]);
    let (Some(_), Some(_)) = (cols.name, cols.website) else {
        tracing::debug!("lawyer table missing mandatory Name/Website headers");
        return Vec::new();
    };

    let mut lawyers = Vec::new();
    for row in &rows[1..] {
        let name = cell(row, cols.name);
        if name.is_empty() {
            continue;
        }

        let link = parse_link(&cell(row, cols.website));
        let Some(url) = link.url else {
            // A lawyer record without a website is not actionable.
            continue;
        };

        lawyers.push(Lawyer {
            name,
            specialty: cell_or_na(row, cols.specialty),
            city: cell_or_na(row, cols.city),
            address: cell_or_na(row, cols.address),
            contact_info: cell_or_na(row, cols.contact),
            website: url,
            website_title: link.title,
            relevance_score: parse_score(&cell(row, cols.relevance)),
            years_of_experience: parse_score(&cell(row, cols.experience)),
            notes: None,
        });
    }
    lawyers
}

/// Column positions for the notary table.
#[derive(Debug, Default)]
struct NotaryColumns {
    office_name: Option<usize>,
    city: Option<usize>,
    address: Option<usize>,
    contact: Option<usize>,
    website: Option<usize>,
    services: Option<usize>,
}

impl NotaryColumns {
    fn resolve(headers: &[String]) -> Self {
        let mut cols = Self::default();
        for (idx, header) in headers.iter().enumerate() {
            let h = header.to_lowercase();
            if h.contains("office name") {
                cols.office_name = Some(idx);
            }
            if h.contains("city") {
                cols.city = Some(idx);
            }
            if h.contains("address") {
                cols.address = Some(idx);
            }
            if h.contains("contact") {
                cols.contact = Some(idx);
            }
            if h.contains("website") {
                cols.website = Some(idx);
            }
            if h.contains("services") {
                cols.services = Some(idx);
            }
        }
        cols
    }
}

/// Parse a notary-office listing table out of a model response.
///
/// The header row must contain `| Office Name`. Only the office name is
/// mandatory; a missing website leaves those fields empty rather than
/// dropping the row.
pub fn parse_notary_table(markdown: &str) -> Vec<Notary> {
    let Some(rows) = table_rows(markdown, "| Office Name") else {
        tracing::debug!("no notary table header found in response");
        return Vec::new();
    };

    let cols = NotaryColumns::resolve(&rows[0]);
    if cols.office_name.is_none() {
        tracing::debug!("notary table missing mandatory Office Name header");
        return Vec::new();
    }

    let mut notaries = Vec::new();
    for row in &rows[1..] {
        let office_name = cell(row, cols.office_name);
        if office_name.is_empty() {
            continue;
        }

        let link = parse_link(&cell(row, cols.website));

        notaries.push(Notary {
            office_name,
            city: cell_or_na(row, cols.city),
            address: cell_or_na(row, cols.address),
            contact_info: cell_or_na(row, cols.contact),
            website: link.url.unwrap_or_default(),
            website_title: link.title,
            services: cols.services.map(|i| cell(row, Some(i))),
        });
    }
    notaries
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAWYER_TABLE: &str = "\
Here are the results you asked for.

| Name | Specialty | City | Address | Contact Info | Website | Years of Experience | Relevance Score |
|------|-----------|------|---------|--------------|---------|---------------------|-----------------|
| Jane Doe | Corporate | Tehran | 1 Main St | 555-1234 | [Doe & Partners](https://doe.example) | 12 | 95% |
| Ali Raad | Family | Shiraz | 2 Elm Ave | 555-9876 | raad-law.ir | 7 | 80% |
";

    #[test]
    fn missing_marker_yields_empty() {
        assert!(parse_lawyer_table("No table here, just prose.").is_empty());
        assert!(parse_notary_table("| Name | Website |\n|---|---|\n| x | y.com |").is_empty());
    }

    #[test]
    fn well_formed_table_yields_one_record_per_row_in_order() {
        let lawyers = parse_lawyer_table(LAWYER_TABLE);
        assert_eq!(lawyers.len(), 2);
        assert_eq!(lawyers[0].name, "Jane Doe");
        assert_eq!(lawyers[1].name, "Ali Raad");
    }

    #[test]
    fn markdown_link_cell_parses_title_and_url() {
        let link = parse_link("[Jane Doe](https://example.com)");
        assert_eq!(link.title, "Jane Doe");
        assert_eq!(link.url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn bare_domain_gets_https_prefix() {
        let link = parse_link("example.com");
        assert_eq!(link.title, "example.com");
        assert_eq!(link.url.as_deref(), Some("https://example.com"));

        let already = parse_link("http://example.com");
        assert_eq!(already.url.as_deref(), Some("http://example.com"));
    }

    #[test]
    fn cell_with_spaces_has_no_url_and_drops_lawyer_row() {
        let link = parse_link("not a website");
        assert_eq!(link.url, None);

        let table = "\
| Name | Website |
|------|---------|
| Jane Doe | not a website |
";
        assert!(parse_lawyer_table(table).is_empty());
    }

    #[test]
    fn non_numeric_scores_default_to_zero() {
        let table = "\
| Name | Website | Years of Experience | Relevance Score |
|------|---------|---------------------|-----------------|
| Jane Doe | doe.example | unknown | very high |
";
        let lawyers = parse_lawyer_table(table);
        assert_eq!(lawyers.len(), 1);
        assert_eq!(lawyers[0].years_of_experience, 0);
        assert_eq!(lawyers[0].relevance_score, 0);
    }

    #[test]
    fn percent_suffix_is_stripped() {
        assert_eq!(parse_score("95%"), 95);
        assert_eq!(parse_score(" 12 "), 12);
        assert_eq!(parse_score(""), 0);
    }

    #[test]
    fn missing_mandatory_headers_abort_parsing() {
        let table = "\
| Name | Specialty |
|------|-----------|
| Jane Doe | Corporate |
";
        assert!(parse_lawyer_table(table).is_empty());
    }

    #[test]
    fn header_matching_is_case_insensitive_substring() {
        // The table marker itself is exact, but header cells resolve by
        // case-insensitive substring.
        let table = "\
| Name of lawyer | WEBSITE link |
|----------------|--------------|
| Jane Doe | doe.example |
";
        let lawyers = parse_lawyer_table(table);
        assert_eq!(lawyers.len(), 1);
        assert_eq!(lawyers[0].website, "https://doe.example");
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse_lawyer_table(LAWYER_TABLE), parse_lawyer_table(LAWYER_TABLE));
    }

    #[test]
    fn notary_rows_survive_without_website() {
        let table = "\
| Office Name | City | Services Offered |
|-------------|------|------------------|
| Office 21 | Shiraz | deeds, power of attorney |
";
        let notaries = parse_notary_table(table);
        assert_eq!(notaries.len(), 1);
        assert_eq!(notaries[0].office_name, "Office 21");
        assert_eq!(notaries[0].website, "");
        assert_eq!(notaries[0].services.as_deref(), Some("deeds, power of attorney"));
    }

    #[test]
    fn notary_table_resolves_links() {
        let table = "\
| Office Name | Website |
|-------------|---------|
| Office 5 | [Official page](https://office5.example) |
";
        let notaries = parse_notary_table(table);
        assert_eq!(notaries[0].website, "https://office5.example");
        assert_eq!(notaries[0].website_title, "Official page");
    }
}
