//! Append-only history of the probes issued during one run.

use shared_types::RequestRecord;

#[derive(Debug, Default)]
pub struct InteractionRecorder {
    records: Vec<RequestRecord>,
}

impl InteractionRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `record` and return a view of it. Records are never removed
    /// or modified once appended.
    pub fn record(&mut self, record: RequestRecord) -> &RequestRecord {
        self.records.push(record);
        &self.records[self.records.len() - 1]
    }

    pub fn history(&self) -> &[RequestRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&RequestRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_history(self) -> Vec<RequestRecord> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::HttpMethod;
    use std::collections::BTreeMap;

    fn failure(url: &str) -> RequestRecord {
        RequestRecord::transport_failure(HttpMethod::Get, url, BTreeMap::new(), None, "refused")
    }

    #[test]
    fn test_keeps_insertion_order() {
        let mut recorder = InteractionRecorder::new();
        recorder.record(failure("http://a/1"));
        let last = recorder.record(failure("http://a/2")).clone();

        assert_eq!(last.url, "http://a/2");
        assert_eq!(recorder.len(), 2);
        let urls: Vec<_> = recorder.into_history().into_iter().map(|r| r.url).collect();
        assert_eq!(urls, vec!["http://a/1", "http://a/2"]);
    }
}
