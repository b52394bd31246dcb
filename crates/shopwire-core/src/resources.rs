//! Endpoint wrappers over [`ShopApi::fetch_paged`].
//!
//! Each wrapper supplies the endpoint, method, body envelope and result key of
//! one Admin REST resource and returns the same success flag.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::client::ShopApi;
use crate::error::ApiError;
use crate::redact::render;
use crate::request::QueryParams;
use crate::rest::{PageReducer, RestCall};

/// `{"id": id}` merged with the fields of `data`; fields in `data` win.
fn with_id(id: u64, data: Value) -> Value {
    let mut merged = Map::new();
    merged.insert("id".to_string(), json!(id));
    if let Value::Object(fields) = data {
        merged.extend(fields);
    }
    Value::Object(merged)
}

/// `{key: data}`.
fn envelope(key: &str, data: Value) -> Value {
    let mut map = Map::new();
    map.insert(key.to_string(), data);
    Value::Object(map)
}

impl ShopApi {
    /// Record a failure detected after the last call returned.
    fn fail_after_call(&mut self, err: &ApiError) {
        let method = self.request_method().unwrap_or_default();
        let message = format!(
            "{err}[ {method} ]{}/{}",
            self.session().host(),
            self.called_endpoint()
                .unwrap_or_default()
                .trim_start_matches('/')
        );
        self.fail(err, message);
    }
}

// Products.
impl ShopApi {
    /// `GET products.json`; results are the product list.
    pub async fn get_products(&mut self, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get("products.json")
                .with_query_params(params)
                .with_result_key("products"),
        )
        .await
    }

    /// Single product by id; results are the product object.
    pub async fn get_product(&mut self, id: u64) -> bool {
        if !self
            .get_products(QueryParams::new().with("ids", id.to_string()))
            .await
        {
            return false;
        }
        match self.take_results() {
            Some(Value::Array(mut products)) if !products.is_empty() => {
                self.set_results(Some(products.swap_remove(0)));
                true
            }
            other => {
                let err = ApiError::SchemaMismatch {
                    endpoint: self.called_endpoint().unwrap_or_default().to_string(),
                    status: 200,
                    key: "products".to_string(),
                    body: render(&other),
                };
                self.fail_after_call(&err);
                false
            }
        }
    }

    /// `GET products/count.json`.
    pub async fn get_products_count(&mut self) -> bool {
        self.fetch_paged(RestCall::get("products/count.json")).await
    }

    /// `POST products.json`.
    pub async fn add_product(&mut self, data: Value) -> bool {
        self.fetch_paged(
            RestCall::post("products.json", envelope("product", data)).with_result_key("product"),
        )
        .await
    }

    /// `PUT products/{id}.json`.
    pub async fn update_product(&mut self, id: u64, data: Value) -> bool {
        self.fetch_paged(
            RestCall::put(
                format!("products/{id}.json"),
                envelope("product", with_id(id, data)),
            )
            .with_result_key("product"),
        )
        .await
    }

    /// `DELETE products/{id}.json`.
    pub async fn delete_product(&mut self, id: u64) -> bool {
        self.fetch_paged(RestCall::delete(format!("products/{id}.json")))
            .await
    }

    /// `POST products/{id}/images.json`.
    pub async fn add_product_image(&mut self, product_id: u64, data: Value) -> bool {
        self.fetch_paged(
            RestCall::post(
                format!("products/{product_id}/images.json"),
                envelope("image", data),
            )
            .with_result_key("image"),
        )
        .await
    }

    /// `GET products/{id}/variants.json`.
    pub async fn get_variants(&mut self, product_id: u64, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get(format!("products/{product_id}/variants.json"))
                .with_query_params(params)
                .with_result_key("variants"),
        )
        .await
    }

    /// `GET variants/{id}.json`.
    pub async fn get_variant(&mut self, variant_id: u64, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get(format!("variants/{variant_id}.json"))
                .with_query_params(params)
                .with_result_key("variant"),
        )
        .await
    }

    /// `PUT variants/{id}.json`.
    pub async fn update_variant(&mut self, variant_id: u64, data: Value) -> bool {
        self.fetch_paged(
            RestCall::put(
                format!("variants/{variant_id}.json"),
                envelope("variant", with_id(variant_id, data)),
            )
            .with_result_key("variant"),
        )
        .await
    }
}

// Orders.
impl ShopApi {
    /// `GET orders/{id}.json`.
    pub async fn get_order(&mut self, order_id: u64) -> bool {
        self.fetch_paged(
            RestCall::get(format!("orders/{order_id}.json")).with_result_key("order"),
        )
        .await
    }

    /// `GET orders.json`, defaulting to `status=any`.
    ///
    /// With a reducer each page of orders is passed through it; pages it
    /// empties are dropped.
    pub async fn get_orders(
        &mut self,
        params: QueryParams,
        reducer: Option<PageReducer>,
    ) -> bool {
        let mut call = RestCall::get("orders.json")
            .with_query("status", "any")
            .with_query_params(params)
            .with_result_key("orders");
        if let Some(reducer) = reducer {
            call = call.with_reducer(reducer);
        }
        self.fetch_paged(call).await
    }

    /// `GET orders/count.json`, defaulting to `status=any`.
    pub async fn get_orders_count(&mut self, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get("orders/count.json")
                .with_query("status", "any")
                .with_query_params(params),
        )
        .await
    }

    /// `PUT orders/{id}.json`.
    pub async fn update_order(&mut self, order_id: u64, data: Value) -> bool {
        self.fetch_paged(
            RestCall::put(
                format!("orders/{order_id}.json"),
                envelope("order", with_id(order_id, data)),
            )
            .with_result_key("order"),
        )
        .await
    }

    /// `POST orders/{id}/cancel.json`; `data` may carry `reason`, `amount`, `note`.
    pub async fn cancel_order(&mut self, order_id: u64, data: Value) -> bool {
        self.fetch_paged(
            RestCall::post(format!("orders/{order_id}/cancel.json"), data)
                .with_result_key("order"),
        )
        .await
    }

    /// `POST orders/{id}/close.json`.
    pub async fn close_order(&mut self, order_id: u64) -> bool {
        self.fetch_paged(
            RestCall::post(format!("orders/{order_id}/close.json"), json!({}))
                .with_result_key("order"),
        )
        .await
    }
}

// Collections.
impl ShopApi {
    /// `GET custom_collections.json`.
    pub async fn get_collections(&mut self, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get("custom_collections.json")
                .with_query_params(params)
                .with_result_key("custom_collections"),
        )
        .await
    }

    /// `GET smart_collections.json`.
    pub async fn get_smart_collections(&mut self, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get("smart_collections.json")
                .with_query_params(params)
                .with_result_key("smart_collections"),
        )
        .await
    }

    /// `POST custom_collections.json`.
    pub async fn add_collection(&mut self, data: Value) -> bool {
        self.fetch_paged(
            RestCall::post("custom_collections.json", envelope("custom_collection", data))
                .with_result_key("custom_collection"),
        )
        .await
    }

    /// `GET collects.json`.
    pub async fn get_collects(&mut self, params: QueryParams) -> bool {
        self.fetch_paged(
            RestCall::get("collects.json")
                .with_query_params(params)
                .with_result_key("collects"),
        )
        .await
    }

    /// `POST collects.json` linking a product to a collection.
    pub async fn add_collect(&mut self, collection_id: u64, product_id: u64) -> bool {
        let body = json!({
            "collect": {"collection_id": collection_id, "product_id": product_id}
        });
        self.fetch_paged(RestCall::post("collects.json", body).with_result_key("collect"))
            .await
    }
}

// Store.
impl ShopApi {
    /// `GET shop.json`.
    pub async fn get_store_data(&mut self) -> bool {
        self.fetch_paged(RestCall::get("shop.json").with_result_key("shop"))
            .await
    }

    /// `GET locations.json`.
    pub async fn get_locations(&mut self) -> bool {
        self.fetch_paged(RestCall::get("locations.json").with_result_key("locations"))
            .await
    }

    /// `GET locations/{id}.json`.
    pub async fn get_location(&mut self, location_id: u64) -> bool {
        self.fetch_paged(
            RestCall::get(format!("locations/{location_id}.json")).with_result_key("location"),
        )
        .await
    }

    /// `GET webhooks.json`.
    pub async fn get_webhooks(&mut self) -> bool {
        self.fetch_paged(RestCall::get("webhooks.json").with_result_key("webhooks"))
            .await
    }

    /// `POST webhooks.json`.
    pub async fn add_webhook(&mut self, data: Value) -> bool {
        self.fetch_paged(
            RestCall::post("webhooks.json", envelope("webhook", data)).with_result_key("webhook"),
        )
        .await
    }

    /// `DELETE webhooks/{id}.json`.
    pub async fn delete_webhook(&mut self, webhook_id: u64) -> bool {
        self.fetch_paged(RestCall::delete(format!("webhooks/{webhook_id}.json")))
            .await
    }

    /// `GET admin/oauth/access_scopes.json` (unversioned).
    pub async fn get_access_scopes(&mut self) -> bool {
        self.fetch_paged(
            RestCall::get("admin/oauth/access_scopes.json").with_result_key("access_scopes"),
        )
        .await
    }
}

// Metafields, transactions, inventory.
impl ShopApi {
    /// `GET products/{id}/metafields.json`.
    pub async fn get_product_metafields(
        &mut self,
        product_id: u64,
        params: QueryParams,
    ) -> bool {
        self.fetch_paged(
            RestCall::get(format!("products/{product_id}/metafields.json"))
                .with_query_params(params)
                .with_result_key("metafields"),
        )
        .await
    }

    /// `POST products/{id}/metafields.json`.
    ///
    /// Build `packet` with [`meta_packet`](crate::meta_packet).
    pub async fn add_product_metafield(&mut self, product_id: u64, packet: Value) -> bool {
        self.fetch_paged(
            RestCall::post(
                format!("products/{product_id}/metafields.json"),
                envelope("metafield", packet),
            )
            .with_result_key("metafield"),
        )
        .await
    }

    /// `DELETE metafields/{id}.json`.
    pub async fn delete_metafield(&mut self, metafield_id: u64) -> bool {
        self.fetch_paged(RestCall::delete(format!("metafields/{metafield_id}.json")))
            .await
    }

    /// `GET orders/{id}/transactions.json`.
    pub async fn get_transactions(&mut self, order_id: u64) -> bool {
        self.fetch_paged(
            RestCall::get(format!("orders/{order_id}/transactions.json"))
                .with_result_key("transactions"),
        )
        .await
    }

    /// `POST inventory_levels/set.json`.
    pub async fn set_inventory_level(
        &mut self,
        inventory_item_id: u64,
        location_id: u64,
        available: i64,
    ) -> bool {
        let body = json!({
            "location_id": location_id,
            "inventory_item_id": inventory_item_id,
            "available": available,
        });
        self.fetch_paged(
            RestCall::post("inventory_levels/set.json", body).with_result_key("inventory_level"),
        )
        .await
    }

    /// `GET inventory_levels.json` for one item at one location.
    pub async fn get_inventory_level(
        &mut self,
        inventory_item_id: u64,
        location_id: u64,
    ) -> bool {
        self.fetch_paged(
            RestCall::get("inventory_levels.json")
                .with_query("inventory_item_ids", inventory_item_id.to_string())
                .with_query("location_ids", location_id.to_string())
                .with_result_key("inventory_levels"),
        )
        .await
    }
}

/// Quantity of one order line item to fulfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentLine {
    /// Order line item id.
    pub line_item_id: u64,
    /// Quantity requested; capped at what is still fulfillable.
    pub quantity: u64,
}

impl FulfillmentLine {
    /// Request `quantity` units of `line_item_id`.
    #[must_use]
    pub const fn new(line_item_id: u64, quantity: u64) -> Self {
        Self {
            line_item_id,
            quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FulfillmentOrder {
    id: u64,
    #[serde(default)]
    line_items: Vec<FulfillmentOrderItem>,
}

#[derive(Debug, Deserialize)]
struct FulfillmentOrderItem {
    id: u64,
    #[serde(default)]
    line_item_id: u64,
    #[serde(default)]
    fulfillable_quantity: u64,
}

/// `line_items_by_fulfillment_order` for the requested lines.
///
/// Fulfillment orders holding none of the requested lines are skipped.
fn line_items_by_fulfillment_order(
    orders: &[FulfillmentOrder],
    lines: &[FulfillmentLine],
) -> Vec<Value> {
    orders
        .iter()
        .filter_map(|order| {
            let mut items: Vec<(u64, u64)> = Vec::new();
            for item in order.line_items.iter().filter(|item| item.line_item_id > 0) {
                for line in lines.iter().filter(|line| line.line_item_id == item.line_item_id) {
                    let quantity = line.quantity.min(item.fulfillable_quantity);
                    if quantity == 0 {
                        continue;
                    }
                    match items.iter_mut().find(|(id, _)| *id == item.id) {
                        Some(entry) => entry.1 = quantity,
                        None => items.push((item.id, quantity)),
                    }
                }
            }
            (!items.is_empty()).then(|| {
                let items: Vec<Value> = items
                    .into_iter()
                    .map(|(id, quantity)| json!({"id": id, "quantity": quantity}))
                    .collect();
                json!({
                    "fulfillment_order_id": order.id,
                    "fulfillment_order_line_items": items,
                })
            })
        })
        .collect()
}

// Fulfillments, checkouts.
impl ShopApi {
    /// `GET orders/{id}/fulfillments.json`.
    pub async fn get_fulfillments(&mut self, order_id: u64) -> bool {
        self.fetch_paged(
            RestCall::get(format!("orders/{order_id}/fulfillments.json"))
                .with_result_key("fulfillments"),
        )
        .await
    }

    /// `GET orders/{id}/fulfillment_orders.json`.
    pub async fn get_fulfillment_orders(&mut self, order_id: u64) -> bool {
        self.fetch_paged(
            RestCall::get(format!("orders/{order_id}/fulfillment_orders.json"))
                .with_result_key("fulfillment_orders"),
        )
        .await
    }

    /// `GET fulfillment_services.json` across all scopes.
    pub async fn get_fulfillment_services(&mut self) -> bool {
        self.fetch_paged(
            RestCall::get("fulfillment_services.json")
                .with_query("scope", "all")
                .with_result_key("fulfillment_services"),
        )
        .await
    }

    /// `POST fulfillments.json`.
    pub async fn create_fulfillment(&mut self, data: Value) -> bool {
        self.fetch_paged(
            RestCall::post("fulfillments.json", envelope("fulfillment", data))
                .with_result_key("fulfillment"),
        )
        .await
    }

    /// Fulfill `lines` of an order through its fulfillment orders.
    ///
    /// Loads the order's fulfillment orders, caps each requested quantity at
    /// what is still fulfillable, and posts a single fulfillment. Fails
    /// without posting when nothing is left to fulfill.
    pub async fn fulfill_order(
        &mut self,
        order_id: u64,
        lines: &[FulfillmentLine],
        tracking_info: Value,
        notify_customer: bool,
        message: &str,
    ) -> bool {
        if !self.get_fulfillment_orders(order_id).await {
            return false;
        }
        let fetched = self.take_results().unwrap_or(Value::Null);
        let orders: Vec<FulfillmentOrder> = match serde_json::from_value(fetched.clone()) {
            Ok(orders) => orders,
            Err(err) => {
                self.fail_after_call(&ApiError::from(err));
                return false;
            }
        };

        let line_request = line_items_by_fulfillment_order(&orders, lines);
        if line_request.is_empty() {
            let err = ApiError::config(format!(
                "No fulfill-able quantities found for order id {order_id}: {}",
                render(&fetched)
            ));
            self.fail_after_call(&err);
            return false;
        }

        self.create_fulfillment(json!({
            "message": message,
            "notify_customer": notify_customer,
            "tracking_info": tracking_info,
            "line_items_by_fulfillment_order": line_request,
        }))
        .await
    }

    /// `GET checkouts/{token}.json`.
    pub async fn get_checkout(&mut self, token: &str) -> bool {
        self.fetch_paged(
            RestCall::get(format!("checkouts/{token}.json")).with_result_key("checkout"),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_id_lets_data_win() {
        assert_eq!(
            with_id(7, json!({"title": "Hat"})),
            json!({"id": 7, "title": "Hat"})
        );
        assert_eq!(with_id(7, json!({"id": 8})), json!({"id": 8}));
        assert_eq!(with_id(7, Value::Null), json!({"id": 7}));
    }

    #[test]
    fn envelope_wraps_data() {
        assert_eq!(
            envelope("webhook", json!({"topic": "orders/create"})),
            json!({"webhook": {"topic": "orders/create"}})
        );
    }

    fn fulfillment_orders(value: Value) -> Vec<FulfillmentOrder> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn fulfillment_quantities_are_capped() {
        let orders = fulfillment_orders(json!([{
            "id": 100,
            "line_items": [
                {"id": 1, "line_item_id": 11, "fulfillable_quantity": 2},
                {"id": 2, "line_item_id": 12, "fulfillable_quantity": 0},
                {"id": 3, "line_item_id": 13, "fulfillable_quantity": 5}
            ]
        }]));
        let lines = [
            FulfillmentLine::new(11, 5),
            FulfillmentLine::new(12, 1),
            FulfillmentLine::new(13, 1),
        ];

        assert_eq!(
            line_items_by_fulfillment_order(&orders, &lines),
            vec![json!({
                "fulfillment_order_id": 100,
                "fulfillment_order_line_items": [
                    {"id": 1, "quantity": 2},
                    {"id": 3, "quantity": 1}
                ]
            })]
        );
    }

    #[test]
    fn foreign_fulfillment_orders_are_skipped() {
        let orders = fulfillment_orders(json!([
            {"id": 100, "line_items": [{"id": 1, "line_item_id": 99, "fulfillable_quantity": 1}]},
            {"id": 200, "line_items": [{"id": 2, "line_item_id": 11, "fulfillable_quantity": 1}]}
        ]));

        let request = line_items_by_fulfillment_order(&orders, &[FulfillmentLine::new(11, 1)]);

        assert_eq!(request.len(), 1);
        assert_eq!(request[0]["fulfillment_order_id"], 200);
        assert!(line_items_by_fulfillment_order(&orders, &[]).is_empty());
    }
}
