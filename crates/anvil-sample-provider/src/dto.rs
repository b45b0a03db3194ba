//! The wire type the Sample provider port returns; distinct from
//! [`anvil_types::SampleRef`], which is the weak reference Anvil itself
//! persists.

use anvil_types::SampleId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDto {
 pub id: SampleId,
 pub content: serde_json::Value,
 pub version: String,
 pub metadata: serde_json::Value,
 pub asset_urls: Vec<String>,
}
