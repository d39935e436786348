use axum::{body::Body, Router};
use booknest_app::{
    router::app_router,
    state::{AppConfig, AppState},
};
use booknest_dal::book::Book;
use booknest_store::CoverStore;
use http::{header, Method, Request, StatusCode};
use tower::ServiceExt as _;

const ADMIN_EMAIL: &str = "admin@booknest.test";
const ADMIN_PASSWORD: &str = "sup3r-secret";

const TEST_BOOKS: &str = r#"
INSERT INTO books (id, title, author, genre, price, description, stock_quantity, cover_image)
VALUES (1, 'Dune', 'Frank Herbert', 'Sci-Fi', 9.99, 'Desert planet epic', 12, 'covers/dune.jpg');
INSERT INTO books (id, title, author, genre, price, description, stock_quantity, cover_image)
VALUES (2, 'Emma', 'Jane Austen', NULL, 7.50, NULL, 3, NULL);
"#;

struct TestApp {
    router: Router,
    pool: sqlx::Pool<sqlx::Sqlite>,
    store_dir: tempfile::TempDir,
}

impl TestApp {
    fn store(&self) -> CoverStore {
        CoverStore::new(self.store_dir.path())
    }

    async fn book(&self, id: i64) -> Book {
        booknest_dal::book::BookRepositoryImpl::new(self.pool.clone())
            .get(id)
            .await
            .unwrap()
    }
}

async fn test_app() -> TestApp {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("../../migrations").run(&pool).await.unwrap();
    sqlx::raw_sql(TEST_BOOKS).execute(&pool).await.unwrap();

    booknest_dal::user::UserRepositoryImpl::new(pool.clone())
        .create(booknest_dal::user::CreateUser {
            email: ADMIN_EMAIL.to_string(),
            name: "Admin".to_string(),
            password: Some(ADMIN_PASSWORD.to_string()),
            roles: Some(vec!["admin".to_string()]),
        })
        .await
        .unwrap();

    let store_dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        AppConfig { upload_limit_mb: 6 },
        pool.clone(),
        CoverStore::new(store_dir.path()),
    );
    TestApp {
        router: app_router(state),
        pool,
        store_dir,
    }
}

async fn read_body(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie")
        .to_str()
        .unwrap();
    cookie.split(';').next().unwrap().to_string()
}

async fn login(app: &TestApp) -> String {
    let body = format!(
        "email={}&password={}",
        ADMIN_EMAIL.replace('@', "%40"),
        ADMIN_PASSWORD
    );
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    session_cookie(&response)
}

async fn get_page(app: &TestApp, cookie: &str, uri: &str) -> axum::response::Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

const BOUNDARY: &str = "booknest-test-boundary";

fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((filename, data)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"cover_image\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn post_edit(
    app: &TestApp,
    cookie: &str,
    id: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> axum::response::Response {
    app.router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(format!("/edit_book?id={id}"))
                .header(header::COOKIE, cookie)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(multipart_body(fields, file)))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn valid_fields<'a>() -> Vec<(&'a str, &'a str)> {
    vec![
        ("title", "Dune Messiah"),
        ("author", "Frank Herbert"),
        ("genre", "Sci-Fi"),
        ("price", "11.50"),
        ("description", "Sequel"),
        ("stock_quantity", "7"),
    ]
}

#[tokio::test]
async fn edit_page_requires_admin_session() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/edit_book?id=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn login_with_wrong_password_is_rejected() {
    let app = test_app().await;
    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/login")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("email=admin%40booknest.test&password=nope"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Invalid email or password"));
}

#[tokio::test]
async fn invalid_id_redirects_with_error_flash() {
    let app = test_app().await;
    let cookie = login(&app).await;

    for id in ["abc", "0", "-3", ""] {
        let response = get_page(&app, &cookie, &format!("/edit_book?id={id}")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/manage_books");

        let list = get_page(&app, &cookie, "/manage_books").await;
        let body = read_body(list).await;
        assert!(body.contains("Invalid book ID"), "id={id}");
        assert!(body.contains("alert-error"));
    }
}

#[tokio::test]
async fn unknown_id_redirects_with_not_found_flash() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let response = get_page(&app, &cookie, "/edit_book?id=999").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/manage_books");

    let list = get_page(&app, &cookie, "/manage_books").await;
    let body = read_body(list).await;
    assert!(body.contains("Book not found"));
}

#[tokio::test]
async fn flash_renders_only_once() {
    let app = test_app().await;
    let cookie = login(&app).await;

    get_page(&app, &cookie, "/edit_book?id=999").await;
    let body = read_body(get_page(&app, &cookie, "/manage_books").await).await;
    assert!(body.contains("Book not found"));
    let body = read_body(get_page(&app, &cookie, "/manage_books").await).await;
    assert!(!body.contains("Book not found"));
}

#[tokio::test]
async fn get_renders_prefilled_form() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let response = get_page(&app, &cookie, "/edit_book?id=1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("value=\"Dune\""));
    assert!(body.contains("value=\"Frank Herbert\""));
    assert!(body.contains("value=\"9.99\""));
    assert!(body.contains("value=\"12\""));
    assert!(body.contains("covers/dune.jpg"));
}

#[tokio::test]
async fn missing_title_rerenders_without_db_write() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let fields = [
        ("title", ""),
        ("author", "Jane Doe"),
        ("price", "10"),
        ("stock_quantity", "5"),
    ];
    let response = post_edit(&app, &cookie, "1", &fields, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Title is required"));
    // submitted input is preserved on re-render
    assert!(body.contains("value=\"Jane Doe\""));

    let book = app.book(1).await;
    assert_eq!(book.title, "Dune");
    assert_eq!(book.author, "Frank Herbert");
}

#[tokio::test]
async fn all_violations_are_reported_together() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let fields = [
        ("title", ""),
        ("author", ""),
        ("price", "ten"),
        ("stock_quantity", "-2"),
    ];
    let response = post_edit(&app, &cookie, "1", &fields, None).await;
    let body = read_body(response).await;
    assert!(body.contains("Title is required"));
    assert!(body.contains("Author is required"));
    assert!(body.contains("Price must be a valid number"));
    assert!(body.contains("Stock quantity cannot be negative"));
}

#[tokio::test]
async fn negative_price_blocks_update() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let fields = [
        ("title", "Dune"),
        ("author", "F. Herbert"),
        ("price", "-5"),
        ("stock_quantity", "3"),
    ];
    let response = post_edit(&app, &cookie, "1", &fields, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Price cannot be negative"));

    let book = app.book(1).await;
    assert_eq!(book.price, 9.99);
}

#[tokio::test]
async fn oversized_cover_is_rejected_with_reason() {
    let app = test_app().await;
    let cookie = login(&app).await;

    // put the current cover in place so we can check it survives
    let store = app.store();
    std::fs::create_dir_all(app.store_dir.path().join("covers")).unwrap();
    std::fs::write(app.store_dir.path().join("covers/dune.jpg"), b"old").unwrap();

    let big = vec![0u8; 5 * 1024 * 1024 + 1];
    let response = post_edit(&app, &cookie, "1", &valid_fields(), Some(("huge.jpg", &big))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("maximum size is 5 MB"));

    let book = app.book(1).await;
    assert_eq!(book.title, "Dune");
    assert_eq!(book.cover_image.as_deref(), Some("covers/dune.jpg"));
    assert!(store.contains("covers/dune.jpg").await);
}

#[tokio::test]
async fn upload_over_body_cap_rerenders_with_policy_message() {
    let app = test_app().await;
    let cookie = login(&app).await;

    // well past the 6 MB request body cap, never reaches the store
    let big = vec![0u8; 10 * 1024 * 1024];
    let response = post_edit(&app, &cookie, "1", &valid_fields(), Some(("huge.jpg", &big))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("maximum size is 5 MB"));
    // submitted values survive the re-render
    assert!(body.contains("value=\"Dune Messiah\""));

    let book = app.book(1).await;
    assert_eq!(book.title, "Dune");
    assert_eq!(book.cover_image.as_deref(), Some("covers/dune.jpg"));
}

#[tokio::test]
async fn successful_update_redirects_with_success_flash() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let response = post_edit(&app, &cookie, "1", &valid_fields(), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/manage_books");

    let body = read_body(get_page(&app, &cookie, "/manage_books").await).await;
    assert!(body.contains("alert-success"));
    assert!(body.contains("Book &quot;Dune Messiah&quot; updated successfully!"));

    let book = app.book(1).await;
    assert_eq!(book.title, "Dune Messiah");
    assert_eq!(book.price, 11.50);
    assert_eq!(book.stock_quantity, 7);
    // no file was submitted, the stored cover path is untouched
    assert_eq!(book.cover_image.as_deref(), Some("covers/dune.jpg"));
}

#[tokio::test]
async fn cover_replacement_stores_new_and_deletes_old() {
    let app = test_app().await;
    let cookie = login(&app).await;

    let store = app.store();
    std::fs::create_dir_all(app.store_dir.path().join("covers")).unwrap();
    std::fs::write(app.store_dir.path().join("covers/dune.jpg"), b"old").unwrap();

    let response = post_edit(
        &app,
        &cookie,
        "1",
        &valid_fields(),
        Some(("new-cover.png", b"png bytes")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let book = app.book(1).await;
    let new_cover = book.cover_image.expect("new cover path");
    assert!(new_cover.starts_with("covers/"));
    assert!(new_cover.ends_with(".png"));
    assert!(store.contains(&new_cover).await);
    assert!(!store.contains("covers/dune.jpg").await);
}

#[tokio::test]
async fn update_of_vanished_row_yields_info_flash() {
    let app = test_app().await;
    let cookie = login(&app).await;

    // RAISE(IGNORE) skips the row write, so the load succeeds but the
    // update reports zero rows, same as a concurrent deletion would
    sqlx::raw_sql(
        "CREATE TRIGGER vanish BEFORE UPDATE ON books \
         BEGIN SELECT RAISE(IGNORE); END;",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let response = post_edit(&app, &cookie, "2", &valid_fields(), None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/manage_books");

    let body = read_body(get_page(&app, &cookie, "/manage_books").await).await;
    assert!(body.contains("alert-info"));
    assert!(body.contains("No changes were made to the book."));
}

#[tokio::test]
async fn storage_failure_rerenders_with_generic_message() {
    let app = test_app().await;
    let cookie = login(&app).await;

    sqlx::raw_sql(
        "CREATE TRIGGER books_readonly BEFORE UPDATE ON books \
         BEGIN SELECT RAISE(ABORT, 'books are read only'); END;",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let response = post_edit(&app, &cookie, "1", &valid_fields(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_body(response).await;
    assert!(body.contains("Database error: unable to update the book."));
    // the raw driver error stays server side
    assert!(!body.contains("read only"));
    // submitted values are kept
    assert!(body.contains("value=\"Dune Messiah\""));
}
