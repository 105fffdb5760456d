use super::{SourceFuture, TelemetrySource};
use crate::errors::{AppError, AppResult};
use crate::models::{EvolutionChunk, SourceId};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

type MeasureChunks = BTreeMap<String, Vec<EvolutionChunk>>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplaySource {
    sources: BTreeMap<String, MeasureChunks>,
}

impl ReplaySource {
    pub fn load(path: &Path) -> AppResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> AppResult<Self> {
        serde_json::from_str(raw).map_err(|err| AppError::Source(format!("invalid replay fixture: {}", err)))
    }

    fn measures_for(&self, source: &SourceId) -> AppResult<&MeasureChunks> {
        self.sources
            .get(&source.to_string())
            .ok_or_else(|| AppError::Source(format!("no recording for {}", source)))
    }

    fn recorded_measures(&self, source: &SourceId) -> AppResult<Vec<String>> {
        Ok(self.measures_for(source)?.keys().cloned().collect())
    }

    fn recorded_chunks(&self, source: &SourceId, measure: &str) -> AppResult<Vec<EvolutionChunk>> {
        self.measures_for(source)?
            .get(measure)
            .cloned()
            .ok_or_else(|| AppError::Source(format!("{} has no recording of {}", source, measure)))
    }
}

impl TelemetrySource for ReplaySource {
    fn versions(&self) -> SourceFuture<'_, Vec<String>> {
        let versions = self.sources.keys().cloned().collect::<Vec<_>>();
        Box::pin(async move { AppResult::Ok(versions) })
    }

    fn measures<'a>(&'a self, source: &'a SourceId) -> SourceFuture<'a, Vec<String>> {
        Box::pin(async move { self.recorded_measures(source) })
    }

    fn evolution<'a>(&'a self, source: &'a SourceId, measure: &'a str) -> SourceFuture<'a, Vec<EvolutionChunk>> {
        Box::pin(async move {
            // Let other sources interleave as a network fetch would.
            tokio::task::yield_now().await;
            self.recorded_chunks(source, measure)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::ReplaySource;
    use crate::models::SourceId;
    use crate::pipeline::TelemetrySource;

    const FIXTURE: &str = r#"{
        "sources": {
            "nightly/60": {
                "CERT_VALIDATION_SUCCESS_BY_CA": [
                    {
                        "subRange": { "from": "2018-03-01", "to": "2018-03-02" },
                        "points": [
                            { "date": "2018-03-01", "bins": [0, 4] },
                            { "date": "2018-03-02", "bins": [1, 1] }
                        ]
                    }
                ]
            }
        }
    }"#;

    #[tokio::test]
    async fn serves_recorded_evolutions() {
        let replay = ReplaySource::from_json(FIXTURE).expect("fixture");
        assert_eq!(replay.versions().await.expect("versions"), vec!["nightly/60".to_string()]);

        let source = SourceId::new("nightly", "60");
        let measures = replay.measures(&source).await.expect("measures");
        assert_eq!(measures, vec!["CERT_VALIDATION_SUCCESS_BY_CA".to_string()]);

        let chunks = replay
            .evolution(&source, "CERT_VALIDATION_SUCCESS_BY_CA")
            .await
            .expect("evolution");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].points[1].bins, vec![1, 1]);

        assert!(replay.evolution(&source, "CERT_PINNING_FAILURES_BY_CA").await.is_err());
        assert!(replay.measures(&SourceId::new("beta", "59")).await.is_err());
    }

    #[test]
    fn rejects_malformed_fixture() {
        let err = ReplaySource::from_json("{ \"sources\": 3 }").expect_err("malformed");
        assert!(err.to_string().starts_with("SOURCE_FAILURE"));
    }
}
