use crate::{
    error::{ErrorClass, FilterError},
    filter::RelOp,
    test_fixtures::context,
};

fn malformed(entity: &str, text: &str) -> FilterError {
    let ctx = context();
    let err = ctx.filter_for(entity, text).unwrap_err();
    assert!(
        matches!(err, FilterError::Malformed { .. }),
        "expected malformed error for {text:?}, got {err:?}"
    );
    assert_eq!(err.class(), ErrorClass::Malformed);
    err
}

#[test]
fn exists_on_many_to_one_is_malformed() {
    let err = malformed("Order", "address()");
    assert_eq!(err.span().map(|s| s.range()), Some(0..7));
}

#[test]
fn one_to_many_without_parentheses_is_malformed() {
    let err = malformed("Order", "shipments");
    let FilterError::Malformed { message, .. } = err else {
        unreachable!()
    };
    assert!(message.contains("existence test"), "{message}");
}

#[test]
fn unterminated_exists_is_malformed() {
    let err = malformed("Order", "shipments(");
    let FilterError::Malformed { message, .. } = err else {
        unreachable!()
    };
    assert!(message.contains("unterminated"), "{message}");

    malformed("Order", "shipments(shipmentNotes = ?");
}

#[test]
fn outer_parentheses_on_compared_property_are_malformed() {
    malformed("Order", "(orderTotal) = ?");
    malformed("Shipment", "order.(orderTotal) = ?");
}

#[test]
fn parenthesized_reference_before_an_operator_is_malformed() {
    malformed("Order", "address(addressCity) = ?");
    malformed("Order", "shipments(shipmentNotes) = ?");
}

#[test]
fn outer_parentheses_on_exists_root_are_legal() {
    let ctx = context();
    let f = ctx.filter_for("Order", "(shipments)()").unwrap();

    assert!(f.as_exists().unwrap().chain()[0].is_outer());
    assert_eq!(f.to_string(), "(shipments)()");
}

#[test]
fn unbalanced_and_dangling_input_is_malformed() {
    malformed("Order", "(orderTotal = ?");
    malformed("Order", "orderTotal = ?)");
    malformed("Order", "orderTotal = ? &");
    malformed("Order", "| orderTotal = ?");
    malformed("Order", "orderTotal = ? orderNumber = ?");
    malformed("Order", "orderTotal ?");
    malformed("Order", "orderTotal = 5");
    malformed("Order", "");
}

#[test]
fn comparing_a_relation_is_malformed() {
    malformed("Shipment", "order = ?");
}

#[test]
fn unknown_entity_is_a_schema_error() {
    let ctx = context();
    let err = ctx.filter_for("Nowhere", "a = ?").unwrap_err();

    assert!(matches!(err, FilterError::Schema(_)));
}

#[test]
fn not_binds_tighter_than_and_which_binds_tighter_than_or() {
    let ctx = context();
    let f = ctx
        .filter_for("Order", "!orderTotal = ? & orderNumber = ? | orderID = ?")
        .unwrap();

    assert_eq!(
        f.to_string(),
        "orderTotal != ? & orderNumber = ? | orderID = ?"
    );
}

#[test]
fn grouping_overrides_precedence() {
    let ctx = context();
    let f = ctx
        .filter_for("Order", "orderTotal = ? & (orderNumber = ? | orderID = ?)")
        .unwrap();

    assert_eq!(
        f.to_string(),
        "orderTotal = ? & (orderNumber = ? | orderID = ?)"
    );
    assert_eq!(ctx.filter_for("Order", &f.to_string()).unwrap(), f);
}

#[test]
fn negated_group_applies_de_morgan() {
    let ctx = context();
    let f = ctx
        .filter_for("Order", "!(orderTotal < ? | orderNumber = ?)")
        .unwrap();

    assert_eq!(f.to_string(), "orderTotal >= ? & orderNumber != ?");
}

#[test]
fn all_operators_parse() {
    let ctx = context();
    let order = ctx.entity("Order").unwrap();

    for op in [RelOp::Eq, RelOp::Ne, RelOp::Lt, RelOp::Le, RelOp::Gt, RelOp::Ge] {
        let text = format!("orderTotal {op} ?");
        let f = ctx.filter_for("Order", &text).unwrap();

        assert_eq!(f.as_property().unwrap().op(), op);
        assert_eq!(f, ctx.property(&order, "orderTotal", op).unwrap());
        assert_eq!(f.to_string(), text);
    }
}

#[test]
fn nested_exists_and_outer_joins_render_back() {
    let ctx = context();
    let text = "(address).addressCity = ? & !shipments((shipper).shipperName = ? | shipmentNotes != ?)";
    let f = ctx.filter_for("Order", text).unwrap();

    assert_eq!(f.to_string(), text);
    assert_eq!(ctx.filter_for("Order", &f.to_string()).unwrap(), f);
}

#[test]
fn whitespace_is_insignificant() {
    let ctx = context();
    let a = ctx.filter_for("Order", "address.addressCity=?&shipments()").unwrap();
    let b = ctx
        .filter_for("Order", "  address . addressCity  =  ?  &  shipments ( )  ")
        .unwrap();

    assert_eq!(a, b);
}

#[test]
fn parsing_is_identity_stable_without_cache() {
    let ctx = crate::test_fixtures::context_with(crate::config::FilterConfig {
        parse_cache: false,
        ..Default::default()
    });
    let a = ctx.filter_for("Order", "orderTotal > ? | shipments()").unwrap();
    let b = ctx.filter_for("Order", "orderTotal > ? | shipments()").unwrap();

    assert_eq!(a, b);
}
