mod common;

use reqwest::StatusCode;
use serde_json::{json, Value};

use common::{hit, ADMIN_EMAIL, PASSWORD};
use screener::screening::ScreeningQuery;

// ── Health ──────────────────────────────────────────────────────

#[tokio::test]
async fn health_returns_ok() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");

    common::cleanup(app).await;
}

// ── Registration & Auth ─────────────────────────────────────────

#[tokio::test]
async fn register_bootstraps_a_superuser_without_tenant() {
    let app = common::spawn_app().await;

    let (body, status) = app.register(ADMIN_EMAIL, PASSWORD, "Admin").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());
    assert!(body["refresh_token"].is_string());

    let token = body["access_token"].as_str().unwrap();
    let (me, status) = app.get_auth("/api/v1/me", token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["is_superuser"], true);
    assert!(me["tenant_id"].is_null());
    assert!(me.get("password_hash").is_none());

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_second_user() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.register("other@test.com", PASSWORD, "Other").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("disabled"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn register_rejects_short_password() {
    let app = common::spawn_app().await;

    let (_, status) = app.register(ADMIN_EMAIL, "short", "Admin").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    common::cleanup(app).await;
}

#[tokio::test]
async fn login_valid_and_invalid_credentials() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let (body, status) = app.login(ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let (_, status) = app.login(ADMIN_EMAIL, "wrongpassword").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, status) = app.login("nobody@test.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn refresh_rotates_tokens() {
    let app = common::spawn_app().await;
    let (body, _) = app.register(ADMIN_EMAIL, PASSWORD, "Admin").await;
    let refresh = body["refresh_token"].as_str().unwrap();

    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .header("cookie", format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated: Value = resp.json().await.unwrap();
    assert_ne!(rotated["refresh_token"].as_str().unwrap(), refresh);

    // The old token is spent
    let resp = app
        .client
        .post(app.url("/api/v1/auth/refresh"))
        .header("cookie", format!("refresh_token={refresh}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn api_requires_authentication() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/api/v1/searches")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn pages_redirect_to_login_without_session() {
    let app = common::spawn_app().await;

    let resp = app.client.get(app.url("/dashboard")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/auth/login");

    common::cleanup(app).await;
}

// ── Searches ────────────────────────────────────────────────────

#[tokio::test]
async fn search_by_id_classifies_and_flags() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening
        .answer_with(vec![hit("JUAN PEREZ", "PARADISE PAPERS", true)]);

    let (body, status) = app.search(&token, &json!({ "identification": "123" })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["search"]["term"], "ID: 123");
    assert_eq!(body["search"]["found_results"], true);
    assert_eq!(body["search"]["alert"], true);
    assert_eq!(body["search"]["tenant_id"], tenant["id"]);

    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["classification"], "Amarillo");
    assert_eq!(records[0]["list_type"], "PARADISE PAPERS");
    assert_eq!(records[0]["is_restrictive"], true);

    assert_eq!(
        app.screening.last_query(),
        Some(ScreeningQuery::ById {
            identification: "123".to_string()
        })
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn search_with_both_fields_uses_combined_query() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    let (body, status) = app
        .search(
            &token,
            &json!({ "identification": " 80.123-4 ", "name": "  Juan   Perez " }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["search"]["term"], "ID: 80.123-4 y Nombre: Juan Perez");
    assert_eq!(
        app.screening.last_query(),
        Some(ScreeningQuery::ByIdAndName {
            identification: "80.123-4".to_string(),
            name: "Juan Perez".to_string(),
        })
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn search_without_hits_sets_no_flags() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening.answer_with(vec![]);
    let (body, status) = app.search(&token, &json!({ "name": "Nadie" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["search"]["found_results"], false);
    assert_eq!(body["search"]["alert"], false);
    assert!(body["records"].as_array().unwrap().is_empty());

    app.screening.answer_nothing();
    let (body, status) = app.search(&token, &json!({ "name": "Nadie" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["search"]["found_results"], false);

    common::cleanup(app).await;
}

#[tokio::test]
async fn provider_failure_is_recorded_as_empty_search() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening.fail();
    let (body, status) = app.search(&token, &json!({ "identification": "123" })).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["search"]["found_results"], false);
    assert_eq!(body["search"]["alert"], false);

    let provider_error: bool = sqlx::query_scalar(
        "SELECT (details->>'provider_error')::boolean FROM audit_events WHERE action = 'search.created'",
    )
    .fetch_one(&app.pool)
    .await
    .unwrap();
    assert!(provider_error);

    common::cleanup(app).await;
}

#[tokio::test]
async fn failed_record_insert_rolls_back_the_search() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    sqlx::query(
        "CREATE FUNCTION reject_second_hit() RETURNS trigger AS $$
         BEGIN
             IF NEW.full_name = 'SEGUNDO' THEN
                 RAISE EXCEPTION 'record rejected';
             END IF;
             RETURN NEW;
         END;
         $$ LANGUAGE plpgsql",
    )
    .execute(&app.pool)
    .await
    .unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_second_hit BEFORE INSERT ON records
         FOR EACH ROW EXECUTE FUNCTION reject_second_hit()",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    app.screening.answer_with(vec![
        hit("PRIMERO", "OFAC", true),
        hit("SEGUNDO", "OFAC", true),
    ]);
    let (_, status) = app.search(&token, &json!({ "identification": "123" })).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let searches: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM searches")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    let records: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(searches, 0);
    assert_eq!(records, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn list_type_is_stored_and_classified_verbatim() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening.answer_with(vec![
        hit("A", "   ", false),
        hit("B", " PARADISE PAPERS ", false),
    ]);
    let (body, status) = app.search(&token, &json!({ "identification": "123" })).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let records = body["records"].as_array().unwrap();
    assert_eq!(records[0]["list_type"], "   ");
    assert_eq!(records[0]["classification"], "Rojo");
    assert_eq!(records[1]["list_type"], " PARADISE PAPERS ");
    assert_eq!(records[1]["classification"], "Rojo");

    common::cleanup(app).await;
}

#[tokio::test]
async fn search_validation_errors() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let (body, status) = app.search(&admin, &json!({})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["__all__"].is_string());

    let (body, status) = app
        .search(&admin, &json!({ "identification": "12 3;DROP" }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["identification"].is_string());

    let long_name = "a".repeat(101);
    let (body, status) = app.search(&admin, &json!({ "name": long_name })).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["name"].is_string());

    // Nothing was sent to the provider or stored
    assert!(app.screening.last_query().is_none());
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM searches")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(count, 0);

    common::cleanup(app).await;
}

#[tokio::test]
async fn search_accepts_form_encoding() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let resp = app
        .client
        .post(app.url("/api/v1/searches"))
        .bearer_auth(&admin)
        .form(&[("identificacion", "999")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["search"]["term"], "ID: 999");

    common::cleanup(app).await;
}

#[tokio::test]
async fn history_is_private_and_filterable() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let tid = tenant["id"].as_str();
    let ana = app.user_token(&admin, tid, "ana@acme.com", false).await;
    let bob = app.user_token(&admin, tid, "bob@acme.com", false).await;

    app.screening.answer_with(vec![hit("X", "OFAC", true)]);
    let (first, _) = app.search(&ana, &json!({ "identification": "111" })).await;
    app.screening.answer_with(vec![]);
    app.search(&ana, &json!({ "identification": "222" })).await;
    app.search(&bob, &json!({ "identification": "333" })).await;

    let (page, status) = app.get_auth("/api/v1/searches", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert_eq!(page["page"], 1);

    let (page, _) = app
        .get_auth("/api/v1/searches?has_results=true", &ana)
        .await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["term"], "ID: 111");

    let (page, _) = app.get_auth("/api/v1/searches?term=222", &ana).await;
    assert_eq!(page["total"], 1);

    // Bob cannot open Ana's search
    let id = first["search"]["id"].as_str().unwrap();
    let (_, status) = app.get_auth(&format!("/api/v1/searches/{id}"), &bob).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (detail, status) = app.get_auth(&format!("/api/v1/searches/{id}"), &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["records"].as_array().unwrap().len(), 1);

    common::cleanup(app).await;
}

#[tokio::test]
async fn search_report_is_a_pdf_download() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening
        .answer_with(vec![hit("JUAN PEREZ", "PARADISE PAPERS", true)]);
    let (body, _) = app.search(&token, &json!({ "identification": "123" })).await;
    let id = body["search"]["id"].as_str().unwrap();

    let resp = app
        .get_raw(&format!("/api/v1/searches/{id}/report"), &token)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    let disposition = resp.headers()["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment"));
    assert!(disposition.contains("Reporte-LAFT-"));
    assert!(resp.bytes().await.unwrap().starts_with(b"%PDF"));

    let rendered = app.pdf.rendered.lock().unwrap().clone();
    assert_eq!(rendered.len(), 1);
    assert!(rendered[0].contains("PARADISE PAPERS"));
    assert!(rendered[0].contains("Amarillo"));

    common::cleanup(app).await;
}

// ── Dashboards ──────────────────────────────────────────────────

#[tokio::test]
async fn personal_dashboard_counts_today() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening.answer_with(vec![
        hit("A", "OFAC", true),
        hit("B", "PARADISE PAPERS", false),
        hit("C", "SENADO", false),
    ]);
    app.search(&token, &json!({ "identification": "1" })).await;
    app.screening.answer_with(vec![]);
    app.search(&token, &json!({ "identification": "2" })).await;

    let (dash, status) = app.get_auth("/api/v1/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total_searches"], 2);
    assert_eq!(dash["searches_today"], 2);
    assert_eq!(dash["tiers"]["red"], 1);
    assert_eq!(dash["tiers"]["amber"], 1);
    assert_eq!(dash["tiers"]["pep"], 1);
    assert_eq!(dash["tiers_today"]["red"], 1);

    let today = chrono::Utc::now().format("%d/%m").to_string();
    assert_eq!(dash["daily"]["labels"], json!([today]));
    assert_eq!(dash["daily"]["searches"], json!([2]));
    assert_eq!(dash["daily"]["red"], json!([1]));
    assert_eq!(dash["recent"].as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn dashboard_recent_list_stays_inside_window() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    let (old, _) = app.search(&token, &json!({ "identification": "111" })).await;
    let (fresh, _) = app.search(&token, &json!({ "identification": "222" })).await;

    sqlx::query("UPDATE searches SET created_at = now() - interval '40 days' WHERE id = $1::uuid")
        .bind(old["search"]["id"].as_str().unwrap())
        .execute(&app.pool)
        .await
        .unwrap();

    let (dash, status) = app.get_auth("/api/v1/dashboard", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total_searches"], 1);
    let recent = dash["recent"].as_array().unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0]["id"], fresh["search"]["id"]);

    // the full history still has both
    let (history, _) = app.get_auth("/api/v1/searches", &token).await;
    assert_eq!(history["total"], 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn top_red_sources_keeps_five_busiest() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let tenant = app.create_tenant(&admin, "Acme").await;
    let token = app
        .user_token(&admin, tenant["id"].as_str(), "ana@acme.com", false)
        .await;

    let mut hits = Vec::new();
    for (list, n) in [
        ("OFAC", 3),
        ("ONU", 2),
        ("INTERPOL", 2),
        ("DEA", 1),
        ("FBI", 1),
        ("UE", 1),
        ("BID", 1),
    ] {
        for _ in 0..n {
            hits.push(hit("X", list, true));
        }
    }
    // Not red, never ranked
    hits.push(hit("Y", "PANAMA PAPERS", false));
    app.screening.answer_with(hits);
    app.search(&token, &json!({ "name": "X" })).await;

    let (dash, _) = app.get_auth("/api/v1/dashboard", &token).await;
    let top: Vec<(String, i64)> = dash["top_red_sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["source"].as_str().unwrap().to_string(),
                s["hits"].as_i64().unwrap(),
            )
        })
        .collect();
    assert_eq!(
        top,
        vec![
            ("OFAC".to_string(), 3),
            ("INTERPOL".to_string(), 2),
            ("ONU".to_string(), 2),
            ("BID".to_string(), 1),
            ("DEA".to_string(), 1),
        ]
    );

    common::cleanup(app).await;
}

#[tokio::test]
async fn manage_views_are_tenant_wide_for_superiors_only() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let other = app.create_tenant(&admin, "Other").await;

    let boss = app
        .user_token(&admin, acme["id"].as_str(), "boss@acme.com", true)
        .await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;
    let eve = app
        .user_token(&admin, other["id"].as_str(), "eve@other.com", true)
        .await;

    let (ana_search, _) = app.search(&ana, &json!({ "identification": "1" })).await;
    app.search(&boss, &json!({ "identification": "2" })).await;
    app.search(&eve, &json!({ "identification": "3" })).await;

    let (page, status) = app.get_auth("/api/v1/manage/searches", &boss).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);
    assert!(page["items"][0]["owner_name"].is_string());

    let ana_id = ana_search["search"]["user_id"].as_str().unwrap();
    let (page, _) = app
        .get_auth(&format!("/api/v1/manage/searches?user_id={ana_id}"), &boss)
        .await;
    assert_eq!(page["total"], 1);

    let (dash, status) = app.get_auth("/api/v1/manage/dashboard", &boss).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total_searches"], 2);
    assert_eq!(dash["active_users"], 2);
    assert_eq!(dash["top_users"].as_array().unwrap().len(), 2);

    // The superior reads the search of a colleague
    let search_id = ana_search["search"]["id"].as_str().unwrap();
    let (_, status) = app
        .get_auth(&format!("/api/v1/manage/searches/{search_id}"), &boss)
        .await;
    assert_eq!(status, StatusCode::OK);

    // but not across tenants
    let (_, status) = app
        .get_auth(&format!("/api/v1/manage/searches/{search_id}"), &eve)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // and a plain member does not see the section at all
    let (_, status) = app.get_auth("/api/v1/manage/dashboard", &ana).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn admin_area_is_hidden_from_non_superusers() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let boss = app
        .user_token(&admin, acme["id"].as_str(), "boss@acme.com", true)
        .await;

    for path in [
        "/api/v1/admin/dashboard",
        "/api/v1/admin/tenants",
        "/api/v1/admin/users",
        "/api/v1/admin/batches",
        "/api/v1/admin/reports/monthly",
    ] {
        let (_, status) = app.get_auth(path, &boss).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{path}");
    }

    common::cleanup(app).await;
}

#[tokio::test]
async fn platform_dashboard_and_monthly_report() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let other = app.create_tenant(&admin, "Other").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;
    let eve = app
        .user_token(&admin, other["id"].as_str(), "eve@other.com", false)
        .await;

    app.search(&ana, &json!({ "identification": "1" })).await;
    app.search(&ana, &json!({ "identification": "2" })).await;
    app.search(&eve, &json!({ "identification": "3" })).await;

    let (dash, status) = app.get_auth("/api/v1/admin/dashboard", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(dash["total_searches"], 3);
    assert_eq!(dash["totals"]["tenants"], 2);
    assert_eq!(dash["totals"]["searches"], 3);
    // Busiest tenant is picked when none is asked for
    assert_eq!(dash["selected_tenant"], acme["id"]);
    assert_eq!(dash["top_users"][0]["email"], "ana@acme.com");

    let other_id = other["id"].as_str().unwrap();
    let (dash, _) = app
        .get_auth(&format!("/api/v1/admin/dashboard?tenant_id={other_id}"), &admin)
        .await;
    assert_eq!(dash["selected_tenant"], other["id"]);
    assert_eq!(dash["top_users"][0]["email"], "eve@other.com");

    let month = chrono::Utc::now().format("%Y-%m").to_string();
    let (report, status) = app
        .get_auth(&format!("/api/v1/admin/reports/monthly?month={month}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["month"], month);
    assert_eq!(report["total"], 3);
    assert_eq!(report["counts"], json!([3]));

    let (report, _) = app
        .get_auth(
            &format!("/api/v1/admin/reports/monthly?month={month}&tenant_id={other_id}"),
            &admin,
        )
        .await;
    assert_eq!(report["total"], 1);

    // A garbled month falls back to the current one
    let (report, _) = app
        .get_auth("/api/v1/admin/reports/monthly?month=nope", &admin)
        .await;
    assert_eq!(report["month"], month);

    common::cleanup(app).await;
}

// ── Batches ─────────────────────────────────────────────────────

fn upload(name: &str, data: &'static [u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(data).file_name(name.to_string()),
    )
}

#[tokio::test]
async fn batch_upload_process_and_download() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;

    let (batch, status) = app
        .post_multipart("/api/v1/batches", &ana, upload("lista.csv", b"id\n123\n"))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{batch}");
    assert_eq!(batch["status"], "pending");
    assert_eq!(batch["file_name"], "lista.csv");
    assert!(batch.get("file_path").is_none());
    let id = batch["id"].as_str().unwrap();

    let (list, _) = app.get_auth("/api/v1/batches", &ana).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    // No result before it is completed
    let resp = app
        .get_raw(&format!("/api/v1/batches/{id}/result"), &ana)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let (queue, _) = app.get_auth("/api/v1/admin/batches", &admin).await;
    assert_eq!(queue["pending"], 1);
    assert_eq!(queue["items"][0]["tenant_name"], "Acme");

    let original = app
        .get_raw(&format!("/api/v1/admin/batches/{id}/file"), &admin)
        .await;
    assert_eq!(original.status(), StatusCode::OK);
    assert_eq!(original.bytes().await.unwrap().as_ref(), b"id\n123\n");

    let form = reqwest::multipart::Form::new()
        .text("status", "completed")
        .text("notes", "Sin hallazgos")
        .part(
            "result_file",
            reqwest::multipart::Part::bytes(&b"resultado"[..]).file_name("resultado.xlsx"),
        );
    let (processed, status) = app
        .post_multipart(&format!("/api/v1/admin/batches/{id}/process"), &admin, form)
        .await;
    assert_eq!(status, StatusCode::OK, "{processed}");
    assert_eq!(processed["status"], "completed");
    assert_eq!(processed["notes"], "Sin hallazgos");
    assert!(processed["processed_at"].is_string());

    let resp = app
        .get_raw(&format!("/api/v1/batches/{id}/result"), &ana)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("resultado.xlsx"));
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"resultado");

    let (detail, _) = app
        .get_auth(&format!("/api/v1/admin/batches/{id}"), &admin)
        .await;
    let actions: Vec<&str> = detail["history"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["action"].as_str().unwrap())
        .collect();
    assert!(actions.contains(&"batch.uploaded"));
    assert!(actions.contains(&"batch.processed"));

    common::cleanup(app).await;
}

async fn stored_paths(app: &common::TestApp, batch_id: &str) -> (String, Option<String>) {
    sqlx::query_as("SELECT file_path, result_path FROM batches WHERE id = $1::uuid")
        .bind(batch_id)
        .fetch_one(&app.pool)
        .await
        .unwrap()
}

fn result_form(name: &str, data: &'static [u8]) -> reqwest::multipart::Form {
    reqwest::multipart::Form::new().text("status", "completed").part(
        "result_file",
        reqwest::multipart::Part::bytes(data).file_name(name.to_string()),
    )
}

#[tokio::test]
async fn replaced_and_orphaned_batch_files_are_removed() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;

    let (batch, _) = app
        .post_multipart("/api/v1/batches", &ana, upload("lista.csv", b"id\n123\n"))
        .await;
    let id = batch["id"].as_str().unwrap();
    let process = format!("/api/v1/admin/batches/{id}/process");

    let (_, status) = app
        .post_multipart(&process, &admin, result_form("v1.csv", b"uno"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (source, first) = stored_paths(&app, id).await;
    let first = first.unwrap();
    assert!(std::path::Path::new(&first).exists());

    // a second result replaces the first on disk
    let (_, status) = app
        .post_multipart(&process, &admin, result_form("v2.csv", b"dos"))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, second) = stored_paths(&app, id).await;
    let second = second.unwrap();
    assert_ne!(first, second);
    assert!(!std::path::Path::new(&first).exists());
    assert!(std::path::Path::new(&second).exists());

    // deleting the tenant removes every file of its batches
    let (_, status) = app
        .delete_auth(&format!("/api/v1/admin/tenants/{}", acme["id"].as_str().unwrap()), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!std::path::Path::new(&source).exists());
    assert!(!std::path::Path::new(&second).exists());

    common::cleanup(app).await;
}

#[tokio::test]
async fn batch_upload_rejects_bad_files() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;

    let (body, status) = app
        .post_multipart("/api/v1/batches", &ana, upload("virus.exe", b"MZ"))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["file"].is_string());

    let (body, status) = app
        .post_multipart("/api/v1/batches", &ana, upload("vacio.csv", b""))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["file"].is_string());

    // A superuser outside any tenant has nowhere to file a batch
    let (_, status) = app
        .post_multipart("/api/v1/batches", &admin, upload("lista.csv", b"1"))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn batches_are_tenant_private() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let other = app.create_tenant(&admin, "Other").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;
    let eve = app
        .user_token(&admin, other["id"].as_str(), "eve@other.com", false)
        .await;

    let (batch, _) = app
        .post_multipart("/api/v1/batches", &ana, upload("lista.csv", b"1"))
        .await;
    let id = batch["id"].as_str().unwrap();

    let form = reqwest::multipart::Form::new().text("status", "completed").part(
        "result_file",
        reqwest::multipart::Part::bytes(&b"r"[..]).file_name("r.csv"),
    );
    app.post_multipart(&format!("/api/v1/admin/batches/{id}/process"), &admin, form)
        .await;

    let (list, _) = app.get_auth("/api/v1/batches", &eve).await;
    assert!(list.as_array().unwrap().is_empty());

    let resp = app
        .get_raw(&format!("/api/v1/batches/{id}/result"), &eve)
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn batch_process_requires_a_known_status() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;
    let (batch, _) = app
        .post_multipart("/api/v1/batches", &ana, upload("lista.csv", b"1"))
        .await;
    let id = batch["id"].as_str().unwrap();

    let form = reqwest::multipart::Form::new().text("status", "done");
    let (body, status) = app
        .post_multipart(&format!("/api/v1/admin/batches/{id}/process"), &admin, form)
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["status"].is_string());

    common::cleanup(app).await;
}

// ── Tenants ─────────────────────────────────────────────────────

#[tokio::test]
async fn tenant_crud() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let tenant = app.create_tenant(&admin, "Acme Ltda").await;
    assert_eq!(tenant["slug"], "acme-ltda");
    let id = tenant["id"].as_str().unwrap();

    let (_, status) = app
        .post_auth("/api/v1/admin/tenants", &admin, &json!({ "name": "Acme  Ltda" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status) = app
        .post_auth("/api/v1/admin/tenants", &admin, &json!({ "name": "  " }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (updated, status) = app
        .put_auth(
            &format!("/api/v1/admin/tenants/{id}"),
            &admin,
            &json!({ "name": "Acme SAS", "slug": "acme" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Acme SAS");
    assert_eq!(updated["slug"], "acme");

    app.create_user(&admin, Some(id), "ana@acme.com", false).await;
    let (detail, status) = app.get_auth(&format!("/api/v1/admin/tenants/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["members"].as_array().unwrap().len(), 1);

    let (list, _) = app.get_auth("/api/v1/admin/tenants", &admin).await;
    assert_eq!(list[0]["user_count"], 1);

    let (_, status) = app.delete_auth(&format!("/api/v1/admin/tenants/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    let (_, status) = app.get_auth(&format!("/api/v1/admin/tenants/{id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, status) = app.delete_auth(&format!("/api/v1/admin/tenants/{id}"), &admin).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

// ── Users ───────────────────────────────────────────────────────

#[tokio::test]
async fn user_management() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let tid = acme["id"].as_str();

    let user = app.create_user(&admin, tid, "ana@acme.com", false).await;
    let id = user["id"].as_str().unwrap();
    assert_eq!(user["tenant_id"], acme["id"]);
    assert_eq!(user["is_active"], true);

    let (_, status) = app
        .post_auth(
            "/api/v1/admin/users",
            &admin,
            &json!({ "tenant_id": tid, "email": "ANA@acme.com", "password": PASSWORD, "name": "Ana" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, status) = app
        .post_auth(
            "/api/v1/admin/users",
            &admin,
            &json!({ "tenant_id": uuid::Uuid::now_v7(), "email": "x@acme.com", "password": PASSWORD, "name": "X" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (updated, status) = app
        .put_auth(
            &format!("/api/v1/admin/users/{id}"),
            &admin,
            &json!({ "is_superior": true, "name": "Ana María" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["is_superior"], true);
    assert_eq!(updated["name"], "Ana María");
    assert_eq!(updated["tenant_id"], acme["id"]);

    let (updated, _) = app
        .put_auth(
            &format!("/api/v1/admin/users/{id}"),
            &admin,
            &json!({ "tenant_id": null }),
        )
        .await;
    assert!(updated["tenant_id"].is_null());

    let (list, _) = app.get_auth("/api/v1/admin/users", &admin).await;
    assert_eq!(list.as_array().unwrap().len(), 2);

    common::cleanup(app).await;
}

#[tokio::test]
async fn deleting_a_user_deactivates_it() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let user = app
        .create_user(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;
    let id = user["id"].as_str().unwrap();

    let (_, status) = app.delete_auth(&format!("/api/v1/admin/users/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);

    let (found, status) = app.get_auth(&format!("/api/v1/admin/users/{id}"), &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["is_active"], false);

    let (_, status) = app.login("ana@acme.com", PASSWORD).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    common::cleanup(app).await;
}

#[tokio::test]
async fn superuser_cannot_deactivate_themselves() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let (me, _) = app.get_auth("/api/v1/me", &admin).await;
    let id = me["id"].as_str().unwrap();

    let (_, status) = app.delete_auth(&format!("/api/v1/admin/users/{id}"), &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app
        .put_auth(
            &format!("/api/v1/admin/users/{id}"),
            &admin,
            &json!({ "is_active": false }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, status) = app.login(ADMIN_EMAIL, PASSWORD).await;
    assert_eq!(status, StatusCode::OK);

    common::cleanup(app).await;
}

// ── HTML views ──────────────────────────────────────────────────

#[tokio::test]
async fn html_login_sets_cookies_and_redirects() {
    let app = common::spawn_app().await;
    app.bootstrap().await;

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()["location"], "/admin");
    assert!(resp.headers().get_all("set-cookie").iter().count() >= 2);

    let resp = app
        .client
        .post(app.url("/auth/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", "wrong-password")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("incorrectos"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn html_pages_render_for_a_member() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;

    app.screening.answer_with(vec![hit("JUAN PEREZ", "OFAC", true)]);
    let (body, _) = app.search(&ana, &json!({ "identification": "123" })).await;
    let id = body["search"]["id"].as_str().unwrap();

    for path in [
        "/search".to_string(),
        "/history".to_string(),
        format!("/history/{id}"),
        "/dashboard".to_string(),
        "/batches".to_string(),
    ] {
        let resp = app.get_raw(&path, &ana).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let html = resp.text().await.unwrap();
        assert!(html.contains("ana"), "{path}");
    }

    let resp = app.get_raw(&format!("/history/{id}"), &ana).await;
    assert!(resp.text().await.unwrap().contains("JUAN PEREZ"));

    let resp = app.get_raw("/manage", &ana).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    common::cleanup(app).await;
}

#[tokio::test]
async fn html_search_form_redisplays_errors() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;

    let resp = app
        .client
        .post(app.url("/search"))
        .bearer_auth(&admin)
        .form(&[("identification", "12 3"), ("name", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = resp.text().await.unwrap();
    assert!(html.contains("value=\"12 3\""));

    let resp = app
        .client
        .post(app.url("/search"))
        .bearer_auth(&admin)
        .form(&[("identification", "123")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(resp.headers()["location"]
        .to_str()
        .unwrap()
        .starts_with("/history/"));

    common::cleanup(app).await;
}

#[tokio::test]
async fn html_admin_pages_render() {
    let app = common::spawn_app().await;
    let admin = app.bootstrap().await;
    let acme = app.create_tenant(&admin, "Acme").await;
    let ana = app
        .user_token(&admin, acme["id"].as_str(), "ana@acme.com", false)
        .await;
    app.search(&ana, &json!({ "identification": "1" })).await;
    let (batch, _) = app
        .post_multipart("/api/v1/batches", &ana, upload("lista.csv", b"1"))
        .await;
    let batch_id = batch["id"].as_str().unwrap();

    for path in [
        "/admin".to_string(),
        "/admin/batches".to_string(),
        format!("/admin/batches/{batch_id}"),
        "/admin/reports/monthly".to_string(),
        "/admin/tenants".to_string(),
        "/admin/users".to_string(),
    ] {
        let resp = app.get_raw(&path, &admin).await;
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        assert!(resp.text().await.unwrap().contains("Acme"), "{path}");
    }

    common::cleanup(app).await;
}
