use crate::{
    config::FilterConfig,
    filter::FilterContext,
    model::{EntityModel, PropertyModel, ScalarKind, SchemaRegistry},
};
use tracing_subscriber::EnvFilter;

/// Route engine logs to the test writer; `RUST_LOG=sieve=trace` to see them.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

///
/// Order / Address / Shipment / Shipper
///
/// Orders have one address and many shipments; each shipment has one
/// order and one shipper; shippers have one address.
///

pub(crate) fn schema() -> SchemaRegistry {
    SchemaRegistry::builder()
        .entity(
            EntityModel::new("Order")
                .with_property(PropertyModel::scalar("orderID", ScalarKind::Uint))
                .with_property(PropertyModel::scalar("orderNumber", ScalarKind::Text))
                .with_property(PropertyModel::scalar("orderTotal", ScalarKind::Int))
                .with_property(PropertyModel::scalar("orderComments", ScalarKind::Text).nullable())
                .with_property(PropertyModel::scalar("addressID", ScalarKind::Uint))
                .with_property(PropertyModel::many_to_one("address", "Address"))
                .with_property(PropertyModel::one_to_many("shipments", "Shipment")),
        )
        .entity(
            EntityModel::new("Address")
                .with_property(PropertyModel::scalar("addressID", ScalarKind::Uint))
                .with_property(PropertyModel::scalar("addressLine1", ScalarKind::Text))
                .with_property(PropertyModel::scalar("addressCity", ScalarKind::Text))
                .with_property(PropertyModel::scalar("addressState", ScalarKind::Text))
                .with_property(PropertyModel::scalar("addressZip", ScalarKind::Text))
                .with_property(
                    PropertyModel::scalar("addressCountry", ScalarKind::Text).nullable(),
                ),
        )
        .entity(
            EntityModel::new("Shipment")
                .with_property(PropertyModel::scalar("shipmentID", ScalarKind::Uint))
                .with_property(PropertyModel::scalar("shipmentNotes", ScalarKind::Text).nullable())
                .with_property(PropertyModel::scalar("shipmentDate", ScalarKind::Timestamp))
                .with_property(PropertyModel::scalar("orderID", ScalarKind::Uint))
                .with_property(PropertyModel::many_to_one("order", "Order"))
                .with_property(PropertyModel::scalar("shipperID", ScalarKind::Uint))
                .with_property(PropertyModel::many_to_one("shipper", "Shipper")),
        )
        .entity(
            EntityModel::new("Shipper")
                .with_property(PropertyModel::scalar("shipperID", ScalarKind::Uint))
                .with_property(PropertyModel::scalar("shipperName", ScalarKind::Text))
                .with_property(PropertyModel::scalar("addressID", ScalarKind::Uint))
                .with_property(PropertyModel::many_to_one("address", "Address")),
        )
        .build()
        .expect("fixture schema is valid")
}

pub(crate) fn context() -> FilterContext {
    init_tracing();
    FilterContext::new(schema())
}

pub(crate) fn context_with(config: FilterConfig) -> FilterContext {
    init_tracing();
    FilterContext::with_config(schema(), config).expect("fixture config is valid")
}
