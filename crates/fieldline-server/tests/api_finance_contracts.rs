// SPDX-License-Identifier: Apache-2.0

use serde_json::json;

mod api_contracts_support;
use api_contracts_support::{
    delete_json, get_json, post_json, put_json, seed_client, send_raw_with_method,
    signup_and_login, spawn_app,
};

#[tokio::test]
async fn invoice_round_trip_stamps_and_clears_paid_on() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let client_id = seed_client(app.addr, &token, "Rivera Bakery").await;

    let (status, invoice) = post_json(
        app.addr,
        "/v1/invoices",
        &token,
        &json!({"clientId": client_id, "amountCents": 12_500, "issuedOn": "2026-08-01"}),
    )
    .await;
    assert_eq!(status, 201, "invoice create failed: {invoice}");
    assert_eq!(invoice["status"], "open");
    assert_eq!(invoice["amountCents"], 12_500);
    assert_eq!(invoice["issuedOn"], "2026-08-01");
    assert!(invoice["paidOn"].is_null());
    assert!(invoice["workOrderId"].is_null());
    let id = invoice["id"].as_str().expect("invoice id").to_string();

    let (status, paid) = post_json(
        app.addr,
        &format!("/v1/invoices/{id}/status"),
        &token,
        &json!({"status": "paid"}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(paid["status"], "paid");
    assert!(paid["paidOn"].is_string());

    // Reopening clears the payment date.
    let (status, reopened) = post_json(
        app.addr,
        &format!("/v1/invoices/{id}/status"),
        &token,
        &json!({"status": "open"}),
    )
    .await;
    assert_eq!(status, 200);
    assert!(reopened["paidOn"].is_null());

    let (status, body) = delete_json(app.addr, &format!("/v1/invoices/{id}"), &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    let (status, _) = get_json(app.addr, &format!("/v1/invoices/{id}"), &token).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn invoice_can_reference_a_work_order() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let client_id = seed_client(app.addr, &token, "Rivera Bakery").await;
    let (_, order) = post_json(
        app.addr,
        "/v1/work-orders",
        &token,
        &json!({"clientId": client_id, "title": "Install pane"}),
    )
    .await;
    let order_id = order["id"].as_str().expect("order id");

    let (status, invoice) = post_json(
        app.addr,
        "/v1/invoices",
        &token,
        &json!({
            "clientId": client_id,
            "workOrderId": order_id,
            "amountCents": 90_000,
            "issuedOn": "2026-08-02",
        }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(invoice["workOrderId"], order_id);

    let (status, body) = post_json(
        app.addr,
        "/v1/invoices",
        &token,
        &json!({
            "clientId": client_id,
            "workOrderId": "nope",
            "amountCents": 90_000,
            "issuedOn": "2026-08-02",
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["details"]["field"], "workOrderId");
}

#[tokio::test]
async fn invoice_payloads_are_validated() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let client_id = seed_client(app.addr, &token, "Rivera Bakery").await;

    let (status, body) = post_json(
        app.addr,
        "/v1/invoices",
        &token,
        &json!({"clientId": client_id, "amountCents": -500, "issuedOn": "2026-08-01"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "invoice amount must not be negative");

    let (status, body) = post_json(
        app.addr,
        "/v1/invoices",
        &token,
        &json!({"clientId": client_id, "amountCents": 500}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "missing_field");
    assert_eq!(body["error"]["details"]["field"], "issuedOn");

    let (status, body) = post_json(
        app.addr,
        "/v1/invoices",
        &token,
        &json!({"clientId": client_id, "amountCents": 500, "issuedOn": "Aug 1st"}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["details"]["field"], "issuedOn");
    assert_eq!(body["error"]["details"]["reason"], "expected YYYY-MM-DD");
}

#[tokio::test]
async fn invoice_list_filters_by_status() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let client_id = seed_client(app.addr, &token, "Rivera Bakery").await;

    let mut ids = Vec::new();
    for issued_on in ["2026-08-01", "2026-08-02"] {
        let (status, invoice) = post_json(
            app.addr,
            "/v1/invoices",
            &token,
            &json!({"clientId": client_id, "amountCents": 1_000, "issuedOn": issued_on}),
        )
        .await;
        assert_eq!(status, 201);
        ids.push(invoice["id"].as_str().expect("invoice id").to_string());
    }
    post_json(
        app.addr,
        &format!("/v1/invoices/{}/status", ids[0]),
        &token,
        &json!({"status": "paid"}),
    )
    .await;

    let (status, body) = get_json(app.addr, "/v1/invoices?status=paid", &token).await;
    assert_eq!(status, 200);
    let invoices = body["invoices"].as_array().expect("invoices");
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0]["id"], ids[0].as_str());

    let (status, body) = get_json(app.addr, "/v1/invoices?status=overdue", &token).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["details"]["field"], "status");
}

#[tokio::test]
async fn expense_round_trip_and_validation() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;

    let (status, expense) = post_json(
        app.addr,
        "/v1/expenses",
        &token,
        &json!({
            "description": "Van fuel",
            "category": "fuel",
            "amountCents": 8_000,
            "incurredOn": "2026-08-03",
        }),
    )
    .await;
    assert_eq!(status, 201, "expense create failed: {expense}");
    assert_eq!(expense["category"], "fuel");
    let id = expense["id"].as_str().expect("expense id").to_string();

    let (status, updated) = put_json(
        app.addr,
        &format!("/v1/expenses/{id}"),
        &token,
        &json!({"amountCents": 8_450}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(updated["amountCents"], 8_450);
    assert_eq!(updated["description"], "Van fuel");

    // Category is required; null does not clear it.
    let (status, body) = put_json(
        app.addr,
        &format!("/v1/expenses/{id}"),
        &token,
        &json!({"category": null}),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "missing_field");

    let (status, body) = delete_json(app.addr, &format!("/v1/expenses/{id}"), &token).await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let (status, body) = post_json(
        app.addr,
        "/v1/expenses",
        &token,
        &json!({
            "description": "",
            "category": "fuel",
            "amountCents": 100,
            "incurredOn": "2026-08-03",
        }),
    )
    .await;
    assert_eq!(status, 400, "blank description: {body}");

    let (status, body) = post_json(
        app.addr,
        "/v1/expenses",
        &token,
        &json!({
            "description": "Refund gone wrong",
            "category": "misc",
            "amountCents": -100,
            "incurredOn": "2026-08-03",
        }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["message"], "expense amount must not be negative");
}

#[tokio::test]
async fn finance_summary_reports_window_totals() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let client_id = seed_client(app.addr, &token, "Rivera Bakery").await;

    let invoice = |amount: i64, issued_on: &'static str| {
        let client_id = client_id.clone();
        let token = token.clone();
        async move {
            let (status, body) = post_json(
                app.addr,
                "/v1/invoices",
                &token,
                &json!({"clientId": client_id, "amountCents": amount, "issuedOn": issued_on}),
            )
            .await;
            assert_eq!(status, 201);
            body["id"].as_str().expect("invoice id").to_string()
        }
    };
    let paid_id = invoice(10_000, "2026-08-01").await;
    let _open_id = invoice(5_000, "2026-08-10").await;
    let void_id = invoice(7_000, "2026-08-15").await;
    post_json(
        app.addr,
        &format!("/v1/invoices/{paid_id}/status"),
        &token,
        &json!({"status": "paid"}),
    )
    .await;
    post_json(
        app.addr,
        &format!("/v1/invoices/{void_id}/status"),
        &token,
        &json!({"status": "void"}),
    )
    .await;

    for (description, category, amount, incurred_on) in [
        ("Van fuel", "fuel", 2_000, "2026-08-05"),
        ("Glazing putty", "materials", 1_500, "2026-08-20"),
    ] {
        let (status, _) = post_json(
            app.addr,
            "/v1/expenses",
            &token,
            &json!({
                "description": description,
                "category": category,
                "amountCents": amount,
                "incurredOn": incurred_on,
            }),
        )
        .await;
        assert_eq!(status, 201);
    }

    // Void invoices never count; net is paid minus expenses.
    let (status, summary) = get_json(app.addr, "/v1/finance/summary", &token).await;
    assert_eq!(status, 200, "summary failed: {summary}");
    assert_eq!(summary["invoicedCents"], 15_000);
    assert_eq!(summary["paidCents"], 10_000);
    assert_eq!(summary["openCents"], 5_000);
    assert_eq!(summary["expenseCents"], 3_500);
    assert_eq!(summary["netCents"], 6_500);
    assert_eq!(summary["expensesByCategory"]["fuel"], 2_000);
    assert_eq!(summary["expensesByCategory"]["materials"], 1_500);

    let (status, summary) = get_json(
        app.addr,
        "/v1/finance/summary?from=2026-08-01&to=2026-08-07",
        &token,
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(summary["invoicedCents"], 10_000);
    assert_eq!(summary["paidCents"], 10_000);
    assert_eq!(summary["openCents"], 0);
    assert_eq!(summary["expenseCents"], 2_000);
    assert_eq!(summary["netCents"], 8_000);

    let (status, body) = get_json(
        app.addr,
        "/v1/finance/summary?from=2026-08-07&to=2026-08-01",
        &token,
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["details"]["field"], "from");

    let (status, body) = get_json(app.addr, "/v1/finance/summary?from=soon", &token).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["details"]["reason"], "expected YYYY-MM-DD");
}

#[tokio::test]
async fn finance_routes_expose_no_extra_methods() {
    let app = spawn_app().await;
    let (_, token) = signup_and_login(app.addr, "Acme Glass", "ana@acme-glass.example").await;
    let auth = format!("Bearer {token}");
    let headers = [("authorization", auth.as_str())];

    // Invoices are immutable apart from status; expenses list without a
    // single-document read.
    let (status, _, _) = send_raw_with_method(
        app.addr,
        "PUT",
        "/v1/invoices/01ARZ3NDEKTSV4RRFFQ69G5FAV",
        &headers,
        Some("{}"),
    )
    .await;
    assert_eq!(status, 405);

    let (status, _, _) = send_raw_with_method(
        app.addr,
        "GET",
        "/v1/expenses/01ARZ3NDEKTSV4RRFFQ69G5FAV",
        &headers,
        None,
    )
    .await;
    assert_eq!(status, 405);
}
