//! HTTP-level tests driving the full router.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use common::{file_count, Part, TestApp};

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/api/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_login_and_me() {
    let app = TestApp::new().await;
    let (status, body) = app.login("admin", "admin123").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "admin");
    assert_eq!(body["user"]["roleId"], "role-admin");
    assert_eq!(body["user"]["permissions"], json!(["all"]));

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.get("/api/auth/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "admin");
    assert_eq!(me["permissions"], json!(["all"]));
}

#[tokio::test]
async fn test_login_failures_look_the_same() {
    let app = TestApp::new().await;

    let (wrong_status, wrong_password) = app.login("admin", "nope").await;
    let (unknown_status, unknown_user) = app.login("ghost", "admin123").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_user);
    assert_eq!(wrong_password["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_catalog_requires_token() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/products", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_permission_gate() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, role) = app
        .post(
            "/api/roles",
            &admin,
            json!({ "name": "Clerk", "permissions": ["products.view"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .post(
            "/api/users",
            &admin,
            json!({ "username": "clerk", "password": "secret123", "roleId": role["id"] }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.login("clerk", "secret123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["permissions"], json!(["products.view"]));
    let clerk = body["token"].as_str().unwrap().to_string();

    let (status, body) = app.get("/api/users", &clerk).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, _) = app.get("/api/system/export", &clerk).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get("/api/products", &clerk).await;
    assert_eq!(status, StatusCode::OK);

    let (status, users) = app.get("/api/users", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 2);
    assert!(users[0].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_unknown_permission_code_is_rejected() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/roles",
            &admin,
            json!({ "name": "Odd", "permissions": ["products.fly"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_purchase_receives_stock_and_delete_keeps_it() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, widget) = app
        .post(
            "/api/products",
            &token,
            json!({ "name": "Widget", "price": 100, "quantity": 5 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let widget_id = widget["id"].as_str().unwrap().to_string();

    let (_, supplier) = app
        .post("/api/suppliers", &token, json!({ "name": "Acme" }))
        .await;

    let (status, purchase) = app
        .post(
            "/api/purchases",
            &token,
            json!({
                "supplier": { "id": supplier["id"] },
                "items": [{ "productId": widget_id, "quantity": 3, "unitCost": 60 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(purchase["total"].as_f64(), Some(180.0));
    assert_eq!(purchase["supplier"]["name"], "Acme");

    let (_, widget) = app.get(&format!("/api/products/{widget_id}"), &token).await;
    assert_eq!(widget["quantity"], 8);
    assert_eq!(widget["costPrice"].as_f64(), Some(60.0));

    let purchase_id = purchase["id"].as_str().unwrap();
    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/purchases/{purchase_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, widget) = app.get(&format!("/api/products/{widget_id}"), &token).await;
    assert_eq!(widget["quantity"], 8);

    let (status, _) = app
        .request(
            Method::DELETE,
            &format!("/api/suppliers/{}", supplier["id"].as_str().unwrap()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_invoice_total_overflow_is_rejected() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "customer": { "name": "Walk-in" },
                "items": [{ "productName": "X", "unitPrice": "90000000000000000", "quantity": 2 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, invoices) = app.get("/api/invoices", &token).await;
    assert_eq!(invoices.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_invoice_totals_and_pay() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (_, product) = app
        .post(
            "/api/products",
            &token,
            json!({ "name": "Lamp", "price": 50, "quantity": 10 }),
        )
        .await;
    let (_, customer) = app
        .post("/api/customers", &token, json!({ "name": "Jane" }))
        .await;

    let (status, invoice) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "customer": { "id": customer["id"] },
                "discountType": "percentage",
                "discountValue": 10,
                "subtotal": 999,
                "total": 1,
                "items": [{ "productId": product["id"], "quantity": 4 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(invoice["subtotal"].as_f64(), Some(200.0));
    assert_eq!(invoice["discount"].as_f64(), Some(20.0));
    assert_eq!(invoice["total"].as_f64(), Some(180.0));
    assert_eq!(invoice["customer"]["name"], "Jane");
    assert!(invoice["invoiceNumber"].as_str().unwrap().starts_with("INV-"));

    let product_uri = format!("/api/products/{}", product["id"].as_str().unwrap());
    let (_, unchanged) = app.get(&product_uri, &token).await;
    assert_eq!(unchanged["quantity"], 10);

    let pay_uri = format!("/api/invoices/{}/pay", invoice["id"].as_str().unwrap());
    let (status, paid) = app.post(&pay_uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(paid["status"], "paid");

    let (_, sold) = app.get(&product_uri, &token).await;
    assert_eq!(sold["quantity"], 6);

    let (status, body) = app.post(&pay_uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");

    let (_, customers) = app.get("/api/customers", &token).await;
    assert_eq!(customers[0]["invoiceCount"], 1);
    assert_eq!(customers[0]["totalSpent"].as_f64(), Some(180.0));

    let customer_uri = format!("/api/customers/{}", customer["id"].as_str().unwrap());
    let (status, body) = app
        .request(Method::DELETE, &customer_uri, Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_stock_floor_when_configured() {
    let app = TestApp::with_config(|c| c.inventory.allow_negative_stock = false).await;
    let token = app.admin_token().await;

    let (_, product) = app
        .post(
            "/api/products",
            &token,
            json!({ "name": "Rare", "price": 10, "quantity": 1 }),
        )
        .await;
    let (_, invoice) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "customer": { "name": "Walk-in" },
                "items": [{ "productId": product["id"], "quantity": 2 }]
            }),
        )
        .await;

    let pay_uri = format!("/api/invoices/{}/pay", invoice["id"].as_str().unwrap());
    let (status, body) = app.post(&pay_uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");

    let (_, product) = app
        .get(&format!("/api/products/{}", product["id"].as_str().unwrap()), &token)
        .await;
    assert_eq!(product["quantity"], 1);
}

#[tokio::test]
async fn test_quotation_conversion() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (_, quote) = app
        .post(
            "/api/invoices",
            &token,
            json!({
                "type": "quotation",
                "customer": { "name": "Prospect" },
                "items": [{ "productName": "Consulting", "unitPrice": 120 }]
            }),
        )
        .await;
    assert!(quote["invoiceNumber"].as_str().unwrap().starts_with("QUO-"));

    let (_, quotations) = app.get("/api/invoices?type=quotation", &token).await;
    assert_eq!(quotations.as_array().unwrap().len(), 1);

    let convert_uri = format!("/api/invoices/{}/convert", quote["id"].as_str().unwrap());
    let (status, converted) = app.post(&convert_uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(converted["id"], quote["id"]);
    assert_eq!(converted["type"], "invoice");
    assert_eq!(converted["status"], "pending");
    assert!(converted["invoiceNumber"].as_str().unwrap().starts_with("INV-"));

    let (status, _) = app.post(&convert_uri, &token, json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_expense_requires_amount() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .post("/api/expenses", &token, json!({ "categoryId": "expcat-rent" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, expense) = app
        .post(
            "/api/expenses",
            &token,
            json!({ "categoryId": "expcat-rent", "amount": "1200.50" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(expense["categoryName"], "Rent");
    assert_eq!(expense["amount"].as_f64(), Some(1200.5));
}

#[tokio::test]
async fn test_product_csv_import_is_all_or_nothing() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let imports = app.uploads_dir().join("imports");

    let bad = b"name,price,quantity\nPen,1.20,10\nPencil,0.80,5\n,2.00,1\n";
    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/products/import",
            &token,
            &[Part::file("csv", "products.csv", "text/csv", bad)],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("line 4"));
    assert_eq!(file_count(&imports), 1);

    let (_, products) = app.get("/api/products", &token).await;
    assert!(products.as_array().unwrap().is_empty());

    let good = b"name,price,quantity\nPen,1.20,10\nPencil,0.80,5\n";
    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/products/import",
            &token,
            &[Part::file("csv", "products.csv", "text/csv", good)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 2);
    assert_eq!(file_count(&imports), 1);

    let (_, products) = app.get("/api/products", &token).await;
    assert_eq!(products.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_import_rejects_missing_or_non_csv_file() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/customers/import",
            &token,
            &[Part::text("note", "no file here")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No file uploaded");

    let (status, _) = app
        .multipart(
            Method::POST,
            "/api/customers/import",
            &token,
            &[Part::file("csv", "people.xlsx", "application/vnd.ms-excel", b"x")],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_purchase_csv_import_groups_documents() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let csv = b"invoiceNumber,supplierName,productName,quantity,unitCost\n\
                P-100,Acme,Bolt,10,0.25\n\
                P-101,,Nut,4,0.10\n\
                P-100,Acme,Washer,2,0.05\n";
    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/purchases/import",
            &token,
            &[Part::file("csv", "purchases.csv", "text/csv", csv)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 2);

    let (_, purchases) = app.get("/api/purchases", &token).await;
    let p100 = purchases
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["invoiceNumber"] == "P-100")
        .unwrap();
    assert_eq!(p100["items"].as_array().unwrap().len(), 2);
    assert_eq!(p100["total"].as_f64(), Some(2.6));
    assert_eq!(p100["status"], "received");
}

#[tokio::test]
async fn test_product_image_upload() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;
    let png = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

    let (status, product) = app
        .multipart(
            Method::POST,
            "/api/products",
            &token,
            &[
                Part::text("name", "Poster"),
                Part::text("price", "9.99"),
                Part::file("image", "poster.png", "image/png", &png),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(product["price"].as_f64(), Some(9.99));

    let url = product["imageUrl"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/products/"));
    assert!(url.ends_with(".png"));
    assert_eq!(file_count(&app.uploads_dir().join("products")), 1);

    let served = app
        .raw(Request::builder().uri(&url).body(Body::empty()).unwrap())
        .await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.body, png);

    let (status, _) = app
        .multipart(
            Method::PUT,
            &format!("/api/products/{}", product["id"].as_str().unwrap()),
            &token,
            &[
                Part::text("name", "Poster"),
                Part::file("image", "notes.txt", "text/plain", b"hello"),
            ],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_stock_is_absolute() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    let (_, product) = app
        .post("/api/products", &token, json!({ "name": "Cable", "quantity": 7 }))
        .await;
    let (status, product) = app
        .request(
            Method::PATCH,
            &format!("/api/products/{}/stock", product["id"].as_str().unwrap()),
            Some(&token),
            Some(json!({ "quantity": 2 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(product["quantity"], 2);

    let (status, body) = app.get("/api/products/missing", &token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_backup_export_and_restore() {
    let app = TestApp::new().await;
    let token = app.admin_token().await;

    app.post("/api/products", &token, json!({ "name": "Keep me" }))
        .await;

    let export = app
        .raw(
            Request::builder()
                .uri(format!("/api/system/export?token={token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(export.status, StatusCode::OK);
    let disposition = export.headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.starts_with("attachment; filename=\"backup-"));
    assert_eq!(file_count(&app.backup_dir()), 1);

    let snapshot: serde_json::Value = serde_json::from_slice(&export.body).unwrap();
    assert_eq!(snapshot["products"].as_array().unwrap().len(), 1);
    assert_eq!(snapshot["users"].as_array().unwrap().len(), 1);

    let empty = br#"{"products": []}"#;
    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/system/import",
            &token,
            &[Part::file("backup", "backup.json", "application/json", empty)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"], 1);
    let (_, products) = app.get("/api/products", &token).await;
    assert!(products.as_array().unwrap().is_empty());

    let (status, _) = app
        .multipart(
            Method::POST,
            "/api/system/import",
            &token,
            &[Part::file("backup", "backup.json", "application/json", &export.body)],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, products) = app.get("/api/products", &token).await;
    assert_eq!(products[0]["name"], "Keep me");

    let (status, body) = app
        .multipart(
            Method::POST,
            "/api/system/import",
            &token,
            &[Part::file("backup", "backup.json", "application/json", br#"{"sessions": []}"#)],
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}
