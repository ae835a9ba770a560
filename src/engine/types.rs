// SPDX-License-Identifier: Apache-2.0

//! Data model shared by the federation engine
//!
//! These types mirror the persisted shape of datasets, data requests and
//! connections (field names follow the stored JSON), so a configuration
//! record can be deserialized straight into them.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type DatasetId = i64;
pub type DataRequestId = i64;
pub type ConnectionId = i64;
pub type ChartId = i64;

/// Unique identifier for a single dataset run, used to correlate log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Declared type of a connection.
///
/// Serialized as the stored tag string. Tags outside the known set are kept
/// as `Other` so that dispatch, not deserialization, reports them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionType {
    Postgres,
    Mysql,
    MongoDb,
    Api,
    GoogleAnalytics,
    Firestore,
    RealtimeDb,
    CustomerIo,
    Other(String),
}

impl ConnectionType {
    /// Every type the engine knows how to name.
    pub const KNOWN: [ConnectionType; 8] = [
        ConnectionType::Postgres,
        ConnectionType::Mysql,
        ConnectionType::MongoDb,
        ConnectionType::Api,
        ConnectionType::GoogleAnalytics,
        ConnectionType::Firestore,
        ConnectionType::RealtimeDb,
        ConnectionType::CustomerIo,
    ];

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "postgres" => Self::Postgres,
            "mysql" => Self::Mysql,
            "mongodb" => Self::MongoDb,
            "api" => Self::Api,
            "googleAnalytics" => Self::GoogleAnalytics,
            "firestore" => Self::Firestore,
            "realtimedb" => Self::RealtimeDb,
            "customerio" => Self::CustomerIo,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Postgres => "postgres",
            Self::Mysql => "mysql",
            Self::MongoDb => "mongodb",
            Self::Api => "api",
            Self::GoogleAnalytics => "googleAnalytics",
            Self::Firestore => "firestore",
            Self::RealtimeDb => "realtimedb",
            Self::CustomerIo => "customerio",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for ConnectionType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<ConnectionType> for String {
    fn from(kind: ConnectionType) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configured external data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub connection_type: ConnectionType,
    #[serde(rename = "subType", default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Payload produced by executing a data request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    #[serde(default)]
    pub data: Value,
}

impl ResponseData {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

/// A single configured fetch against one connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRequest {
    pub id: DataRequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<DatasetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    #[serde(rename = "Connection", default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Value>,
    #[serde(default)]
    pub pagination: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Value>,
    #[serde(rename = "responseData", default, skip_serializing_if = "Option::is_none")]
    pub response_data: Option<ResponseData>,
}

impl DataRequest {
    /// Creates a bare request bound to `connection`.
    pub fn new(id: DataRequestId, connection: Option<Connection>) -> Self {
        Self {
            id,
            dataset_id: None,
            connection_id: connection.as_ref().map(|c| c.id),
            connection,
            query: None,
            headers: None,
            pagination: false,
            filters: None,
            configuration: None,
            response_data: None,
        }
    }
}

/// One declarative join rule.
///
/// Every field is optional in storage; a join missing any of the ids, the
/// field paths or the alias does nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    #[serde(default)]
    pub dr_id: Option<DataRequestId>,
    #[serde(default)]
    pub join_id: Option<DataRequestId>,
    #[serde(default)]
    pub dr_field: Option<String>,
    #[serde(default)]
    pub join_field: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Borrowed view of a join with every required field present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinKeys<'a> {
    pub dr_id: DataRequestId,
    pub join_id: DataRequestId,
    pub dr_field: &'a str,
    pub join_field: &'a str,
    pub alias: &'a str,
}

impl JoinSpec {
    /// Whether both request ids and both field paths are set.
    ///
    /// This decides which requests the join pulls into the working set.
    pub fn references_requests(&self) -> bool {
        self.dr_id.is_some()
            && self.join_id.is_some()
            && self.dr_field.as_deref().is_some_and(|f| !f.is_empty())
            && self.join_field.as_deref().is_some_and(|f| !f.is_empty())
    }

    pub fn keys(&self) -> Option<JoinKeys<'_>> {
        if !self.references_requests() {
            return None;
        }
        Some(JoinKeys {
            dr_id: self.dr_id?,
            join_id: self.join_id?,
            dr_field: self.dr_field.as_deref()?,
            join_field: self.join_field.as_deref()?,
            alias: self.alias.as_deref().filter(|a| !a.is_empty())?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinSettings {
    #[serde(default)]
    pub joins: Vec<JoinSpec>,
}

/// A chart-bound aggregation of data requests plus its join rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_id: Option<ChartId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_dr_id: Option<DataRequestId>,
    #[serde(rename = "joinSettings", default, skip_serializing_if = "Option::is_none")]
    pub join_settings: Option<JoinSettings>,
    #[serde(rename = "DataRequests", default)]
    pub data_requests: Vec<DataRequest>,
    /// Remaining persisted options, passed through untouched
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl Dataset {
    pub fn new(id: DatasetId) -> Self {
        Self {
            id,
            chart_id: None,
            legend: None,
            order: None,
            main_dr_id: None,
            join_settings: None,
            data_requests: Vec::new(),
            options: Map::new(),
        }
    }

    pub fn request(&self, id: DataRequestId) -> Option<&DataRequest> {
        self.data_requests.iter().find(|dr| dr.id == id)
    }

    /// The designated main request, falling back to the first request.
    pub fn main_request(&self) -> Option<&DataRequest> {
        self.main_dr_id
            .and_then(|id| self.request(id))
            .or_else(|| self.data_requests.first())
    }

    /// Configured joins in order; empty when none are set.
    pub fn joins(&self) -> &[JoinSpec] {
        self.join_settings
            .as_ref()
            .map(|s| s.joins.as_slice())
            .unwrap_or(&[])
    }
}

/// Extra arguments forwarded to every connector fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchContext {
    pub get_cache: bool,
    pub filters: Option<Value>,
    pub timezone: Option<String>,
    pub chart_id: Option<ChartId>,
}

/// Identifies which request a connector response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRequestRef {
    pub id: DataRequestId,
}

/// What every connector returns from a fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorResponse {
    #[serde(rename = "dataRequest")]
    pub data_request: DataRequestRef,
    #[serde(rename = "responseData")]
    pub response_data: ResponseData,
}

impl ConnectorResponse {
    pub fn new(request_id: DataRequestId, data: Value) -> Self {
        Self {
            data_request: DataRequestRef { id: request_id },
            response_data: ResponseData::new(data),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn connection_type_round_trips_known_and_unknown_tags() {
        let known: ConnectionType = serde_json::from_value(json!("googleAnalytics")).unwrap();
        assert_eq!(known, ConnectionType::GoogleAnalytics);
        assert_eq!(serde_json::to_value(&known).unwrap(), json!("googleAnalytics"));

        let unknown: ConnectionType = serde_json::from_value(json!("ftp")).unwrap();
        assert_eq!(unknown, ConnectionType::Other("ftp".to_string()));
        assert_eq!(unknown.to_string(), "ftp");
    }

    #[test]
    fn dataset_deserializes_from_stored_shape() {
        let dataset: Dataset = serde_json::from_value(json!({
            "id": 7,
            "chart_id": 3,
            "legend": "Revenue",
            "main_dr_id": 2,
            "fillColor": "#fff",
            "joinSettings": { "joins": [
                { "dr_id": 2, "join_id": 1, "dr_field": "root[].a", "join_field": "root[].b", "alias": "x" }
            ]},
            "DataRequests": [
                { "id": 1, "Connection": { "id": 10, "name": "pg", "type": "postgres" } },
                { "id": 2, "connection_id": 11 }
            ]
        }))
        .unwrap();

        assert_eq!(dataset.main_request().map(|dr| dr.id), Some(2));
        assert_eq!(dataset.joins().len(), 1);
        assert_eq!(dataset.options.get("fillColor"), Some(&json!("#fff")));
        assert_eq!(
            dataset.data_requests[0]
                .connection
                .as_ref()
                .map(|c| c.connection_type.clone()),
            Some(ConnectionType::Postgres)
        );
    }

    #[test]
    fn main_request_falls_back_to_first() {
        let mut dataset = Dataset::new(1);
        dataset.data_requests = vec![DataRequest::new(5, None), DataRequest::new(6, None)];
        dataset.main_dr_id = Some(99);
        assert_eq!(dataset.main_request().map(|dr| dr.id), Some(5));

        dataset.main_dr_id = None;
        assert_eq!(dataset.main_request().map(|dr| dr.id), Some(5));

        dataset.data_requests.clear();
        assert!(dataset.main_request().is_none());
    }

    #[test]
    fn join_keys_require_every_field() {
        let full = JoinSpec {
            dr_id: Some(1),
            join_id: Some(2),
            dr_field: Some("root[].a".into()),
            join_field: Some("root[].b".into()),
            alias: Some("x".into()),
        };
        assert!(full.keys().is_some());

        let no_alias = JoinSpec {
            alias: None,
            ..full.clone()
        };
        assert!(no_alias.references_requests());
        assert!(no_alias.keys().is_none());

        let no_field = JoinSpec {
            dr_field: None,
            ..full
        };
        assert!(!no_field.references_requests());
    }
}
