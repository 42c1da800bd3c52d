use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Client;
use tracing::{debug, info};

use super::DatasetStore;
use crate::config::StoreConfig;
use crate::models::{
    Dataset, EmissionRecord, Metrics, NumericField, RecordKeys, SearchParams, CONTINENT, COUNTRY,
    SECTOR_NAME, SUBSECTOR_NAME,
};
use crate::types::{AppError, AppResult};

/// Connects and pings the deployment so a bad URI fails at startup.
pub async fn create_client(config: &StoreConfig) -> AppResult<Client> {
    let client = Client::with_uri_str(&config.uri).await?;

    // Test connection
    client
        .database(&config.database)
        .run_command(doc! { "ping": 1 })
        .await?;

    info!(database = %config.database, "Connected to MongoDB");
    Ok(client)
}

/// MongoDB Atlas adapter using `$vectorSearch`.
///
/// `Client` is a connection pool; every call checks out its own connection,
/// so one store is safe to share across concurrent tool calls.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    config: StoreConfig,
}

impl MongoStore {
    pub fn new(client: Client, config: StoreConfig) -> Self {
        Self { client, config }
    }

    fn collection(&self, dataset: Dataset) -> mongodb::Collection<Document> {
        self.client
            .database(&self.config.database)
            .collection(self.config.collection(dataset))
    }
}

/// `$vectorSearch` followed by a projection that drops `_id` and the stored
/// embedding.
pub fn vector_search_pipeline(
    index: &str,
    dataset: Dataset,
    vector: &[f32],
    search: SearchParams,
) -> Vec<Document> {
    let query_vector: Vec<Bson> = vector.iter().map(|v| Bson::Double(f64::from(*v))).collect();

    let mut projection = doc! { "_id": 0 };
    let categorical = match dataset {
        Dataset::Sector => [SECTOR_NAME, SUBSECTOR_NAME],
        Dataset::Country => [CONTINENT, COUNTRY],
    };
    for column in categorical {
        projection.insert(column, 1);
    }
    for field in NumericField::ALL {
        projection.insert(field.column(), 1);
    }

    vec![
        doc! {
            "$vectorSearch": {
                "index": index,
                "path": "embedding",
                "queryVector": query_vector,
                "numCandidates": i64::from(search.num_candidates),
                "limit": i64::from(search.limit),
            }
        },
        doc! { "$project": projection },
    ]
}

/// Decodes a projected document; unusable numeric values become gaps.
pub fn decode_record(dataset: Dataset, doc: &Document) -> EmissionRecord {
    let keys = match dataset {
        Dataset::Sector => RecordKeys::Sector {
            sector_name: text(doc, SECTOR_NAME),
            subsector_name: text(doc, SUBSECTOR_NAME),
        },
        Dataset::Country => RecordKeys::Country {
            continent: text(doc, CONTINENT),
            country: text(doc, COUNTRY),
        },
    };

    let mut metrics = Metrics::default();
    for field in NumericField::ALL {
        metrics.set(field, numeric(doc.get(field.column())));
    }

    EmissionRecord {
        keys,
        metrics,
        embedding: Vec::new(),
    }
}

fn text(doc: &Document, field: &str) -> String {
    match doc.get(field) {
        Some(Bson::String(s)) => s.clone(),
        Some(Bson::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn numeric(value: Option<&Bson>) -> Option<f64> {
    let parsed = match value? {
        Bson::Double(v) => *v,
        Bson::Int32(v) => f64::from(*v),
        Bson::Int64(v) => *v as f64,
        Bson::String(s) => s.trim().replace(',', "").parse().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

#[async_trait]
impl DatasetStore for MongoStore {
    async fn nearest(
        &self,
        dataset: Dataset,
        vector: &[f32],
        search: SearchParams,
    ) -> AppResult<Vec<EmissionRecord>> {
        let pipeline =
            vector_search_pipeline(self.config.index(dataset), dataset, vector, search);

        let cursor = self.collection(dataset).aggregate(pipeline).await?;
        let docs: Vec<Document> = cursor.try_collect().await?;

        debug!(
            dataset = %dataset,
            num_candidates = search.num_candidates,
            limit = search.limit,
            returned = docs.len(),
            "Vector search completed"
        );

        Ok(docs.iter().map(|d| decode_record(dataset, d)).collect())
    }

    async fn distinct(&self, dataset: Dataset, field: &str) -> AppResult<Vec<String>> {
        let values = self.collection(dataset).distinct(field, doc! {}).await?;

        let mut out: Vec<String> = values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) => Some(s),
                Bson::Null => None,
                other => Some(other.to_string()),
            })
            .collect();
        out.sort();

        if out.is_empty() {
            return Err(AppError::NotFound(format!(
                "No values found for {field} in the {dataset} dataset"
            )));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_shape() {
        let pipeline = vector_search_pipeline(
            "vector_index",
            Dataset::Sector,
            &[0.5, -1.0],
            SearchParams::new(100, 6),
        );
        assert_eq!(pipeline.len(), 2);

        let search = pipeline[0].get_document("$vectorSearch").unwrap();
        assert_eq!(search.get_str("index").unwrap(), "vector_index");
        assert_eq!(search.get_str("path").unwrap(), "embedding");
        assert_eq!(search.get_i64("numCandidates").unwrap(), 100);
        assert_eq!(search.get_i64("limit").unwrap(), 6);
        assert_eq!(search.get_array("queryVector").unwrap().len(), 2);

        let project = pipeline[1].get_document("$project").unwrap();
        assert_eq!(project.get_i32("_id").unwrap(), 0);
        assert_eq!(project.get_i32("Sector_name").unwrap(), 1);
        assert_eq!(project.get_i32("Monthly_%_change").unwrap(), 1);
        assert!(project.get("embedding").is_none());
        assert!(project.get("Country").is_none());
    }

    #[test]
    fn test_decode_mixed_numeric_types() {
        let doc = doc! {
            "Sector_name": "Energy",
            "Subsector_Name": "Power",
            "Mar_2025_Total": 100_i32,
            "Prev_Month": 90_i64,
            "Monthly_%_change": 5.5,
            "2025_YTD": "1,250.5",
            "2024_YTD": Bson::Null,
            "2023_YTD": "n/a",
            "2022_YTD": f64::NAN,
        };
        let record = decode_record(Dataset::Sector, &doc);

        assert_eq!(record.match_key(), "Energy");
        assert_eq!(record.group_key(), "Power");
        assert_eq!(record.metrics.mar_2025_total, Some(100.0));
        assert_eq!(record.metrics.prev_month, Some(90.0));
        assert_eq!(record.metrics.monthly_pct_change, Some(5.5));
        assert_eq!(record.metrics.ytd_2025, Some(1250.5));
        assert_eq!(record.metrics.ytd_2024, None);
        assert_eq!(record.metrics.ytd_2023, None);
        assert_eq!(record.metrics.ytd_2022, None);
        assert_eq!(record.metrics.ytd_2021, None);
    }

    #[test]
    fn test_decode_country_document() {
        let doc = doc! { "Continent": "Asia", "Country": "India", "2021_YTD": 3.25 };
        let record = decode_record(Dataset::Country, &doc);
        assert_eq!(
            record.keys,
            RecordKeys::Country {
                continent: "Asia".to_string(),
                country: "India".to_string()
            }
        );
        assert_eq!(record.metrics.ytd_2021, Some(3.25));
    }
}
