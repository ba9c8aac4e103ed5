//! Car catalogue, search and admin CRUD.

use reqwest::Method;

use crate::api::{ApiClient, ApiRequest, ApiResult, envelope};
use crate::types::{Car, CreateCarRequest, SearchParams, SearchResponse, UpdateCarRequest};

pub async fn get_car(client: &ApiClient, id: &str) -> ApiResult<Car> {
    envelope::decode(client.get(&format!("/cars/{id}")).await?)
}

/// Runs a location search. Never fails on response shape: an unrecognized
/// body is an empty page.
///
/// # Errors
/// Transport and HTTP status failures only.
pub async fn search_cars(client: &ApiClient, params: &SearchParams) -> ApiResult<SearchResponse> {
    let request = ApiRequest::new(Method::GET, "/search").query(params.to_query());
    let body = client.send(request).await?;
    Ok(envelope::search_response(body))
}

pub async fn create_car(client: &ApiClient, car: &CreateCarRequest) -> ApiResult<Car> {
    envelope::decode(client.post("/cars", car).await?)
}

pub async fn update_car(client: &ApiClient, id: &str, update: &UpdateCarRequest) -> ApiResult<Car> {
    envelope::decode(client.put(&format!("/cars/{id}"), update).await?)
}

pub async fn delete_car(client: &ApiClient, id: &str) -> ApiResult<()> {
    client.delete(&format!("/cars/{id}")).await?;
    Ok(())
}
