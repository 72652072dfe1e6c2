//! Semantic Scholar response shapes
//!
//! Every field is optional and decoded leniently: a field with an
//! unexpected type degrades to its default instead of failing the whole
//! record, and a malformed element drops out of its list. `normalize`
//! turns a wire record into `PaperMetadata` once, at the boundary.

use super::traits::SearchPage;
use crate::paper::{Author, PaperId, PaperMetadata};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode a field, falling back to `None` on any type mismatch
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Decode a list, skipping elements that do not fit `T`
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_opt_vec(deserializer)?.unwrap_or_default())
}

/// Like `lenient_vec`, but keeps "not a list" distinct from "empty list"
fn lenient_opt_vec<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireAuthor {
    #[serde(default, deserialize_with = "lenient")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    author_id: Option<String>,
}

/// A bare paper reference inside `references` / `citations` lists
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePaperRef {
    #[serde(default, deserialize_with = "lenient")]
    paper_id: Option<String>,
}

impl WirePaperRef {
    fn into_id(self) -> Option<PaperId> {
        self.paper_id
            .filter(|id| !id.is_empty())
            .map(PaperId::from_string)
    }
}

/// `journal` is either `{ "name": ... }` or a plain string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireJournal {
    Named {
        #[serde(default, deserialize_with = "lenient")]
        name: Option<String>,
    },
    Plain(String),
}

impl WireJournal {
    fn into_name(self) -> Option<String> {
        match self {
            Self::Named { name } => name,
            Self::Plain(name) => Some(name),
        }
    }
}

/// `openAccessPdf` is either `{ "url": ... }` or a plain string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum WirePdf {
    Linked {
        #[serde(default, deserialize_with = "lenient")]
        url: Option<String>,
    },
    Plain(String),
}

impl WirePdf {
    fn into_url(self) -> Option<String> {
        match self {
            Self::Linked { url } => url,
            Self::Plain(url) => Some(url),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WirePaper {
    #[serde(default, deserialize_with = "lenient")]
    paper_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    title: Option<String>,
    #[serde(default, rename = "abstract", deserialize_with = "lenient")]
    abstract_text: Option<String>,
    #[serde(default, deserialize_with = "lenient_vec")]
    authors: Vec<WireAuthor>,
    #[serde(default, deserialize_with = "lenient")]
    year: Option<i32>,
    #[serde(default, deserialize_with = "lenient")]
    citation_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    reference_count: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_vec")]
    references: Option<Vec<WirePaperRef>>,
    #[serde(default, deserialize_with = "lenient_opt_vec")]
    citations: Option<Vec<WirePaperRef>>,
    #[serde(default, deserialize_with = "lenient")]
    venue: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    journal: Option<WireJournal>,
    #[serde(default, deserialize_with = "lenient")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    is_open_access: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    open_access_pdf: Option<WirePdf>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn ref_ids(refs: Option<Vec<WirePaperRef>>) -> Option<Vec<PaperId>> {
    refs.map(|refs| refs.into_iter().filter_map(WirePaperRef::into_id).collect())
}

impl WirePaper {
    /// Normalize into `PaperMetadata`. Records without a paper id are dropped.
    pub(crate) fn normalize(self) -> Option<PaperMetadata> {
        let paper_id = self.paper_id.filter(|id| !id.is_empty())?;

        Some(PaperMetadata {
            paper_id: PaperId::from_string(paper_id),
            title: self.title.unwrap_or_default(),
            abstract_text: non_empty(self.abstract_text),
            authors: self
                .authors
                .into_iter()
                .map(|a| Author::new(a.name.unwrap_or_default(), a.author_id.unwrap_or_default()))
                .collect(),
            year: self.year,
            citation_count: self.citation_count.unwrap_or(0),
            reference_count: self.reference_count.unwrap_or(0),
            references: ref_ids(self.references),
            citations: ref_ids(self.citations),
            venue: non_empty(self.venue),
            journal: non_empty(self.journal.and_then(WireJournal::into_name)),
            url: non_empty(self.url),
            is_open_access: self.is_open_access,
            pdf_url: non_empty(self.open_access_pdf.and_then(WirePdf::into_url)),
        })
    }
}

/// `/paper/search` response page
///
/// `data` stays raw so the page size counts records that later fail to
/// decode or normalize.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireSearchPage {
    #[serde(default, deserialize_with = "lenient_vec")]
    data: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    next: Option<usize>,
    #[serde(default, deserialize_with = "lenient")]
    total: Option<usize>,
}

impl WireSearchPage {
    /// Offset of the page after this one, requested at `offset`.
    ///
    /// An empty page ends the results. Otherwise the service's `next`
    /// wins, then its `total`; with neither, paging continues past the
    /// records received.
    fn next_offset(&self, offset: usize) -> Option<usize> {
        let received = self.data.len();
        if received == 0 {
            return None;
        }
        let following = offset + received;

        match (self.next, self.total) {
            (Some(next), _) => (next > offset).then_some(next),
            (None, Some(total)) => (following < total).then_some(following),
            (None, None) => Some(following),
        }
    }

    pub(crate) fn into_page(self, offset: usize) -> SearchPage {
        let next_offset = self.next_offset(offset);
        let papers = self
            .data
            .into_iter()
            .filter_map(|item| serde_json::from_value::<WirePaper>(item).ok())
            .filter_map(WirePaper::normalize)
            .collect();

        SearchPage {
            papers,
            next_offset,
        }
    }
}

/// One row of `/paper/{id}/references` or `/paper/{id}/citations`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WireEdge {
    #[serde(default, deserialize_with = "lenient")]
    cited_paper: Option<WirePaperRef>,
    #[serde(default, deserialize_with = "lenient")]
    citing_paper: Option<WirePaperRef>,
}

impl WireEdge {
    pub(crate) fn cited_id(self) -> Option<PaperId> {
        self.cited_paper.and_then(WirePaperRef::into_id)
    }

    pub(crate) fn citing_id(self) -> Option<PaperId> {
        self.citing_paper.and_then(WirePaperRef::into_id)
    }
}

/// Edge listing response page
#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireEdgePage {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub(crate) data: Vec<WireEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Option<PaperMetadata> {
        serde_json::from_value::<WirePaper>(value).unwrap().normalize()
    }

    #[test]
    fn full_record_normalizes() {
        let paper = decode(json!({
            "paperId": "p1",
            "title": "Citation graphs",
            "abstract": "We study graphs.",
            "authors": [{"name": "Ada", "authorId": "a1"}],
            "year": 2023,
            "citationCount": 12,
            "referenceCount": 3,
            "references": [{"paperId": "r1"}, {"paperId": null}],
            "citations": [{"paperId": "c1"}],
            "venue": "CHI",
            "journal": {"name": "Journal of Graphs", "volume": "4"},
            "url": "https://example.org/p1",
            "isOpenAccess": true,
            "openAccessPdf": {"url": "https://example.org/p1.pdf", "status": "GREEN"}
        }))
        .unwrap();

        assert_eq!(paper.paper_id.as_str(), "p1");
        assert_eq!(paper.authors, vec![Author::new("Ada", "a1")]);
        assert_eq!(paper.citation_count, 12);
        assert_eq!(paper.references, Some(vec![PaperId::from("r1")]));
        assert_eq!(paper.citations, Some(vec![PaperId::from("c1")]));
        assert_eq!(paper.journal.as_deref(), Some("Journal of Graphs"));
        assert_eq!(paper.pdf_url.as_deref(), Some("https://example.org/p1.pdf"));
        assert_eq!(paper.is_open_access, Some(true));
    }

    #[test]
    fn malformed_fields_degrade_to_defaults() {
        let paper = decode(json!({
            "paperId": "p2",
            "title": null,
            "abstract": 42,
            "authors": [{"name": "Ada"}, "not an author", {"authorId": 7}],
            "year": "twenty twenty",
            "citationCount": -1,
            "journal": "Plain Journal",
            "openAccessPdf": "https://example.org/p2.pdf"
        }))
        .unwrap();

        assert_eq!(paper.title, "");
        assert_eq!(paper.abstract_text, None);
        assert_eq!(paper.authors.len(), 2);
        assert_eq!(paper.authors[0], Author::new("Ada", ""));
        assert_eq!(paper.year, None);
        assert_eq!(paper.citation_count, 0);
        assert_eq!(paper.references, None);
        assert_eq!(paper.journal.as_deref(), Some("Plain Journal"));
        assert_eq!(paper.pdf_url.as_deref(), Some("https://example.org/p2.pdf"));
    }

    #[test]
    fn record_without_id_is_dropped() {
        assert!(decode(json!({"title": "Orphan"})).is_none());
        assert!(decode(json!({"paperId": "", "title": "Empty"})).is_none());
    }

    fn search_page(value: Value, offset: usize) -> SearchPage {
        serde_json::from_value::<WireSearchPage>(value)
            .unwrap()
            .into_page(offset)
    }

    #[test]
    fn search_page_skips_bad_elements() {
        let page = search_page(
            json!({
                "total": 3,
                "data": [{"paperId": "p1", "title": "A"}, 17, {"title": "no id"}]
            }),
            0,
        );

        assert_eq!(page.papers.len(), 1);
        assert_eq!(page.papers[0].title, "A");
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn dropped_records_still_advance_the_offset() {
        let mut data: Vec<Value> = (0..99)
            .map(|i| json!({"paperId": format!("p{}", i), "title": "T"}))
            .collect();
        data.insert(40, json!({"title": "no id"}));

        let page = search_page(json!({"data": data}), 0);

        assert_eq!(page.papers.len(), 99);
        assert_eq!(page.next_offset, Some(100));
    }

    #[test]
    fn next_and_total_bound_paging() {
        let one = json!([{"paperId": "p1"}]);

        assert_eq!(search_page(json!({"data": one.clone(), "next": 150}), 100).next_offset, Some(150));
        assert_eq!(search_page(json!({"data": one.clone(), "total": 101}), 100).next_offset, None);
        assert_eq!(search_page(json!({"data": one.clone(), "total": 500}), 100).next_offset, Some(101));
        assert_eq!(search_page(json!({"data": one.clone(), "next": 100}), 100).next_offset, None);
    }

    #[test]
    fn missing_data_is_an_empty_page() {
        let page = search_page(json!({"total": 0}), 0);
        assert!(page.papers.is_empty());
        assert_eq!(page.next_offset, None);
    }

    #[test]
    fn edge_page_extracts_ids() {
        let page: WireEdgePage = serde_json::from_value(json!({
            "data": [
                {"citedPaper": {"paperId": "r1"}},
                {"citedPaper": {"paperId": null}},
                {"citingPaper": {"paperId": "c1"}}
            ]
        }))
        .unwrap();

        let cited: Vec<_> = page.data.into_iter().filter_map(WireEdge::cited_id).collect();
        assert_eq!(cited, vec![PaperId::from("r1")]);
    }
}
