// ============================================================
// Layer 6 — Remote Corpus (HF datasets-server)
// ============================================================
// Pages through the datasets-server "rows" JSON endpoint:
//
//   GET /rows?dataset=<id>&config=default&split=train
//            &offset=<n>&length=<≤100>
//
//   { "rows": [ { "row_idx": 0, "row": { "ja": "…", "ko": "…" } }, … ],
//     "num_rows_total": 4300000 }
//
// Paging stops at max_rows, at the reported total, or at the
// first short page. A set HF_TOKEN is sent as a bearer token.

use anyhow::Result;
use serde_json::Value;

use crate::data::split_file::ColumnNames;
use crate::domain::errors::PipelineError;
use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

pub const DATASETS_SERVER_URL: &str = "https://datasets-server.huggingface.co/rows";
pub const DEFAULT_DATASET:     &str = "traintogpb/aihub-koja-translation-integrated-large-4.3m";

/// The endpoint refuses pages longer than this
const PAGE_SIZE: usize = 100;

pub struct DatasetsServerSource {
    dataset:  String,
    split:    String,
    columns:  ColumnNames,
    max_rows: usize,
    token:    Option<String>,
    base_url: String,
    client:   reqwest::blocking::Client,
}

impl DatasetsServerSource {
    pub fn new(dataset: impl Into<String>, columns: ColumnNames, max_rows: usize) -> Result<Self> {
        let dataset = dataset.into();
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("koja-mt/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::retrieval(&dataset, format!("cannot create HTTP client: {e}")))?;

        Ok(Self {
            dataset,
            split: "train".to_string(),
            columns,
            max_rows,
            token: std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty()),
            base_url: DATASETS_SERVER_URL.to_string(),
            client,
        })
    }

    pub fn with_split(mut self, split: impl Into<String>) -> Self {
        self.split = split.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn page_request(&self, offset: usize, length: usize) -> reqwest::blocking::RequestBuilder {
        let offset = offset.to_string();
        let length = length.to_string();

        let request = self.client.get(&self.base_url).query(&[
            ("dataset", self.dataset.as_str()),
            ("config", "default"),
            ("split", self.split.as_str()),
            ("offset", offset.as_str()),
            ("length", length.as_str()),
        ]);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None        => request,
        }
    }

    fn fetch_page(&self, offset: usize, length: usize) -> Result<Value> {
        let response = self
            .page_request(offset, length)
            .send()
            .map_err(|e| PipelineError::retrieval(self.describe(), format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::retrieval(
                self.describe(),
                format!("datasets-server returned {status} at offset {offset}"),
            )
            .into());
        }

        let body = response
            .json::<Value>()
            .map_err(|e| PipelineError::retrieval(self.describe(), format!("invalid JSON: {e}")))?;
        Ok(body)
    }
}

impl CorpusSource for DatasetsServerSource {
    fn describe(&self) -> String {
        format!("datasets-server '{}' ({} split)", self.dataset, self.split)
    }

    fn fetch(&self) -> Result<Vec<SentencePair>> {
        let mut pairs = Vec::with_capacity(self.max_rows.min(100_000));

        while pairs.len() < self.max_rows {
            let length = PAGE_SIZE.min(self.max_rows - pairs.len());
            let body   = self.fetch_page(pairs.len(), length)?;
            let page   = parse_rows(&body, &self.columns)
                .map_err(|msg| PipelineError::retrieval(self.describe(), msg))?;

            let received = page.pairs.len();
            pairs.extend(page.pairs);
            tracing::debug!("Fetched {} rows ({} total)", received, pairs.len());

            if received < length || page.total.is_some_and(|t| pairs.len() >= t) {
                break;
            }
        }

        Ok(pairs)
    }
}

#[derive(Debug)]
struct RowsPage {
    pairs: Vec<SentencePair>,
    total: Option<usize>,
}

fn parse_rows(body: &Value, columns: &ColumnNames) -> std::result::Result<RowsPage, String> {
    let rows = body
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| "missing 'rows' array in response".to_string())?;

    let total = body
        .get("num_rows_total")
        .and_then(Value::as_u64)
        .map(|t| t as usize);

    let mut pairs = Vec::with_capacity(rows.len());
    for (i, entry) in rows.iter().enumerate() {
        let row  = entry.get("row").unwrap_or(entry);
        let cell = |name: &str| {
            row.get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| format!("row {i} has no text column '{name}'"))
        };
        pairs.push(SentencePair::new(cell(&columns.source)?, cell(&columns.target)?));
    }

    Ok(RowsPage { pairs, total })
}
