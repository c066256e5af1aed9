use std::{collections::BTreeSet, path::PathBuf};

use hf_hub::api::sync::ApiRepo;

use crate::error::VlmError;

/// Collect the shard names listed in a safetensors index file.
pub(crate) fn safetensors_shards(index: &str) -> Result<Vec<String>, VlmError> {
    let json: serde_json::Value =
        serde_json::from_str(index).map_err(|e| VlmError::InvalidWeightIndex(e.to_string()))?;

    let weight_map = json
        .get("weight_map")
        .and_then(|m| m.as_object())
        .ok_or_else(|| VlmError::InvalidWeightIndex("no weight_map object".to_string()))?;

    let shards = weight_map
        .values()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect::<BTreeSet<_>>();

    if shards.is_empty() {
        return Err(VlmError::InvalidWeightIndex("empty weight_map".to_string()));
    }

    Ok(shards.into_iter().collect())
}

/// Download every safetensors shard referenced by `json_file` in the repo.
pub(crate) fn hub_load_safetensors(
    repo: &ApiRepo,
    json_file: &str,
) -> Result<Vec<PathBuf>, VlmError> {
    let index_path = repo.get(json_file)?;
    let index = std::fs::read_to_string(index_path)?;

    safetensors_shards(&index)?
        .iter()
        .map(|shard| repo.get(shard).map_err(VlmError::from))
        .collect()
}
