use std::io::Cursor;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::routing;
use http_body_util::BodyExt;
use printer_bot::content::JOKES;
use printer_bot::{AppState, Config, PrinterDevice, SharedPrinter, api};
use serde_json::{Value, json};
use thermal_printer::{CharacterProfile, MemoryPrinter, PrintSettings, encode_strict};
use tower::ServiceExt;

fn state_with(memory: &MemoryPrinter) -> AppState {
    let config = Config::from_lookup(|_| None).expect("default config");
    let printer = SharedPrinter::new(
        PrinterDevice::Memory(memory.clone()),
        PrintSettings::default(),
    );
    AppState::with_printer(config, printer)
}

async fn call(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = api::build_app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

const RASTER: [u8; 4] = [0x1D, 0x76, 0x30, 0x00];
const BOUNDARY: &str = "XPRINTBOUNDARY";

/// 16x8 black square encoded as PNG
fn small_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(16, 8, image::Rgba([0, 0, 0, 255]));
    let mut png = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}

fn upload(path: &str, filename: &str, content_type: &str, data: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\n\
         Content-Type: {ct}\r\n\r\n",
        b = BOUNDARY,
        f = filename,
        ct = content_type
    )
    .into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(path)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Serve `body` with `content_type` at `/file` on a local port
async fn serve_file(content_type: &'static str, body: Vec<u8>) -> String {
    let app = Router::new().route(
        "/file",
        routing::get(move || {
            let body = body.clone();
            async move { ([(header::CONTENT_TYPE, content_type)], body) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/file", addr)
}

#[tokio::test]
async fn test_root() {
    let (status, body) = call(state_with(&MemoryPrinter::new()), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "running");
    assert_eq!(body["message"], "Thermal Printer API");
}

#[tokio::test]
async fn test_printer_status() {
    let (status, body) = call(state_with(&MemoryPrinter::new()), get("/printer/status")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "connected");
    assert_eq!(body["vendor_id"], "0x1504");
    assert_eq!(body["product_id"], "0x0101");

    let (_, body) = call(state_with(&MemoryPrinter::missing()), get("/printer/status")).await;
    assert_eq!(body["status"], "disconnected");
}

#[tokio::test]
async fn test_print_text() {
    let memory = MemoryPrinter::new();
    let (status, body) = call(
        state_with(&memory),
        post_json("/print/text", json!({ "text": "Blåbær" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["details"]["cut"], true);

    let writes = memory.writes();
    assert_eq!(
        writes[1],
        encode_strict("Blåbær", CharacterProfile::Cp1252).unwrap()
    );
    assert!(writes.last().unwrap().starts_with(&[0x1D, 0x56]));
    assert_eq!(memory.closes(), 1);
}

#[tokio::test]
async fn test_print_text_without_cut() {
    let memory = MemoryPrinter::new();
    let (status, body) = call(
        state_with(&memory),
        post_json("/print/text", json!({ "text": "Hei", "cut": false })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"]["cut"], false);
    assert!(!memory.writes().iter().any(|w| w.starts_with(&[0x1D, 0x56])));
}

#[tokio::test]
async fn test_unprintable_text_writes_nothing() {
    let memory = MemoryPrinter::new();
    let (status, body) = call(
        state_with(&memory),
        post_json("/print/text", json!({ "text": "日本" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNPRINTABLE");
    assert!(memory.bytes().is_empty());
    assert_eq!(memory.closes(), 1);
}

#[tokio::test]
async fn test_missing_printer() {
    let (status, body) = call(
        state_with(&MemoryPrinter::missing()),
        post_json("/print/text", json!({ "text": "Hello" })),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "error");
    assert_eq!(body["code"], "PRINTER_UNAVAILABLE");
}

#[tokio::test]
async fn test_print_receipt() {
    let memory = MemoryPrinter::new();
    let request = post_json(
        "/print/receipt",
        json!({
            "items": [
                { "name": "Kaffe", "price": 35.5, "quantity": 2 },
                { "name": "Bolle", "price": 20.0 }
            ]
        }),
    );
    let (status, body) = call(state_with(&memory), request).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["details"]["items"], 2);
    assert_eq!(body["details"]["total"], "91.00");

    let bytes = memory.bytes();
    assert!(contains(&bytes, b"Receipt Printer Store"));
    assert!(contains(&bytes, b"  2x 35.50 = 71.00"));
}

#[tokio::test]
async fn test_empty_receipt_rejected() {
    let memory = MemoryPrinter::new();
    let (status, body) = call(
        state_with(&memory),
        post_json("/print/receipt", json!({ "items": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(memory.opens(), 0);
}

#[tokio::test]
async fn test_print_joke_and_fortune() {
    let memory = MemoryPrinter::new();

    let (status, body) = call(state_with(&memory), post_json("/print/joke", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    let joke = body["details"]["joke"].as_str().unwrap();
    assert!(JOKES.contains(&joke));

    let (status, body) = call(state_with(&memory), post_json("/print/fortune", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["details"]["lucky_numbers"].as_array().unwrap().len(), 6);
    assert_eq!(memory.opens(), 2);
}

#[tokio::test]
async fn test_print_codes() {
    let memory = MemoryPrinter::new();

    let (status, _) = call(
        state_with(&memory),
        post_json("/print/qr", json!({ "text": "https://example.org" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(contains(&memory.bytes(), &[0x1D, 0x28, 0x6B]));

    memory.clear();
    let (status, _) = call(
        state_with(&memory),
        post_json("/print/barcode", json!({ "code": "ABC-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(contains(&memory.bytes(), b"ABC-123"));

    let (status, _) = call(
        state_with(&memory),
        post_json("/print/barcode", json!({ "code": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_upload_requires_image() {
    let memory = MemoryPrinter::new();
    let request = upload("/print/image", "notes.txt", "text/plain", b"hello");

    let (status, body) = call(state_with(&memory), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("not recognized as an image"));
    assert_eq!(memory.opens(), 0);
}

#[tokio::test]
async fn test_undecodable_image() {
    let memory = MemoryPrinter::new();
    let request = upload("/print/image", "broken.png", "image/png", b"not a png");

    let (status, body) = call(state_with(&memory), request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "UNPRINTABLE");
    assert_eq!(memory.opens(), 0);
}

#[tokio::test]
async fn test_print_image_upload() {
    let memory = MemoryPrinter::new();
    let request = upload("/print/image", "square.png", "image/png", &small_png());

    let (status, body) = call(state_with(&memory), request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["details"]["filename"], "square.png");
    assert_eq!(body["details"]["cut"], true);

    let writes = memory.writes();
    assert!(writes.iter().any(|w| contains(w, &RASTER)));
    // 16 dots = 2 bytes per row, 8 rows, all black
    assert!(contains(&memory.bytes(), &[0x1D, 0x76, 0x30, 0x00, 2, 0, 8, 0, 0xFF, 0xFF]));
    assert!(writes.last().unwrap().starts_with(&[0x1D, 0x56]));
    assert_eq!(memory.closes(), 1);
}

#[tokio::test]
async fn test_print_image_upload_without_cut() {
    let memory = MemoryPrinter::new();
    let request = upload("/print/image?cut=false", "square.png", "image/png", &small_png());

    let (status, body) = call(state_with(&memory), request).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["details"]["cut"], false);
    assert!(contains(&memory.bytes(), &RASTER));
    assert!(!memory.writes().iter().any(|w| w.starts_with(&[0x1D, 0x56])));
}

#[tokio::test]
async fn test_print_image_from_url() {
    let memory = MemoryPrinter::new();
    let url = serve_file("image/png", small_png()).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/print/image-url?url={}", url))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(state_with(&memory), request).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["details"]["url"], url.as_str());
    assert!(contains(&memory.bytes(), &RASTER));
    assert!(memory.writes().last().unwrap().starts_with(&[0x1D, 0x56]));
    assert_eq!(memory.closes(), 1);
}

#[tokio::test]
async fn test_print_image_from_url_form() {
    let memory = MemoryPrinter::new();
    let url = serve_file("image/png", small_png()).await;

    let request = Request::builder()
        .method("POST")
        .uri("/print/url")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("url={}&cut=false", url)))
        .unwrap();
    let (status, body) = call(state_with(&memory), request).await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["details"]["cut"], false);
    assert!(contains(&memory.bytes(), &RASTER));
}

#[tokio::test]
async fn test_url_must_point_to_an_image() {
    let memory = MemoryPrinter::new();
    let url = serve_file("text/html", b"<html></html>".to_vec()).await;

    let request = Request::builder()
        .method("POST")
        .uri(format!("/print/image-url?url={}", url))
        .body(Body::empty())
        .unwrap();
    let (status, body) = call(state_with(&memory), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
    assert_eq!(memory.opens(), 0);
}

#[tokio::test]
async fn test_url_scheme_is_checked() {
    let memory = MemoryPrinter::new();
    let request = Request::builder()
        .method("POST")
        .uri("/print/image-url?url=file:///etc/passwd")
        .body(Body::empty())
        .unwrap();
    let (status, _) = call(state_with(&memory), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(memory.opens(), 0);
}
