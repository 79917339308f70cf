use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Batch {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub file_name: String,
    #[serde(skip_serializing)]
    pub file_path: String,
    pub status: String,
    pub result_file_name: Option<String>,
    #[serde(skip_serializing)]
    pub result_path: Option<String>,
    pub notes: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchStatus {
    Pending,
    Processing,
    Completed,
    Rejected,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Processing => "processing",
            BatchStatus::Completed => "completed",
            BatchStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(BatchStatus::Pending),
            "processing" => Some(BatchStatus::Processing),
            "completed" => Some(BatchStatus::Completed),
            "rejected" => Some(BatchStatus::Rejected),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BatchStatus::Pending => "Pendiente",
            BatchStatus::Processing => "En proceso",
            BatchStatus::Completed => "Completado",
            BatchStatus::Rejected => "Rechazado",
        }
    }

    /// Whether the lot is finished and its requester should be told.
    pub fn is_final(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Rejected)
    }
}

impl Batch {
    pub fn status(&self) -> Option<BatchStatus> {
        BatchStatus::parse(&self.status)
    }
}
