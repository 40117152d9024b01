use super::{ApiError, BackendClient, ModelInfo};

/// Fetch the model catalog in the order the server lists it.
pub async fn fetch_models(client: &BackendClient) -> Result<Vec<ModelInfo>, ApiError> {
    let response = client.http().get(client.url("/api/models")).send().await?;

    if !response.status().is_success() {
        return Err(ApiError::from_response(response).await);
    }

    let mut models = response
        .json::<Vec<ModelInfo>>()
        .await
        .map_err(|err| ApiError::Decode(err.to_string()))?;
    dedup_models(&mut models);
    Ok(models)
}

/// Drop blank and repeated names while keeping the first occurrence in place.
pub fn dedup_models(models: &mut Vec<ModelInfo>) {
    let mut seen = std::collections::HashSet::new();
    models.retain(|model| !model.name.trim().is_empty() && seen.insert(model.name.clone()));
}
