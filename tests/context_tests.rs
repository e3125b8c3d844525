mod common;

use chainrouter::{App, Context, DecodeError, HandlerResult};
use common::{body_string, get, post_form, post_json, MultipartBuilder};
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{Request, StatusCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

fn greet(ctx: &mut Context) -> HandlerResult {
    let name = ctx.query("name", "World").to_string();
    ctx.send_string(format!("Hello, {name}"))
}

#[test]
fn test_query_default_and_value() {
    let app = App::new();
    app.get("/query", greet).unwrap();
    let router = app.build();

    let res = router.handle(get("/query"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(&res), "Hello, World");

    let res = router.handle(get("/query?name=Shepard"));
    assert_eq!(body_string(&res), "Hello, Shepard");

    let res = router.handle(get("/query?name=Commander%20Shepard"));
    assert_eq!(body_string(&res), "Hello, Commander Shepard");

    let res = router.handle(get("/query?name=Commander+Shepard&name=ignored"));
    assert_eq!(body_string(&res), "Hello, Commander Shepard");
}

#[test]
fn test_header_and_cookie_defaults() {
    let app = App::new();
    app.get("/additional", |ctx: &mut Context| {
        let header = ctx.header("name", "lah kocak").to_string();
        let cookie = ctx.cookie("name", "gimana dah?").to_string();
        ctx.send_string(format!("{header} {cookie}"))
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(get("/additional"));
    assert_eq!(body_string(&res), "lah kocak gimana dah?");

    let req = Request::get("/additional")
        .header("Name", "wadidaw")
        .header(COOKIE, "name=wadidiw")
        .body("")
        .unwrap();
    let res = router.handle(req);
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(&res), "wadidaw wadidiw");
}

#[test]
fn test_path_param() {
    let app = App::new();
    app.get("/param/:id/weleh", |ctx: &mut Context| {
        let id = ctx.param("id", "").to_string();
        ctx.send_string(format!("Ini dia: {id}"))
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(get("/param/chunli/weleh"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(&res), "Ini dia: chunli");
}

#[test]
fn test_urlencoded_form() {
    let app = App::new();
    app.post("/form", |ctx: &mut Context| {
        let name = ctx.form_value("name", "").to_string();
        let game = ctx.form_value("game", "").to_string();
        ctx.send_string(format!("Here's: {name}, she appears in {game}"))
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(post_form("/form", "name=Chun-Li&game=Street+Fighter+6"));
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_string(&res),
        "Here's: Chun-Li, she appears in Street Fighter 6"
    );
}

#[test]
fn test_multipart_upload_saved_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().to_path_buf();
    let content: &[u8] = b"Chun-Li\r\nSpinning Bird Kick\n\x00\xff";

    let app = App::new();
    app.post("/upload", move |ctx: &mut Context| {
        let file = ctx.form_file("file")?;
        ctx.save_file(file, target.join(&file.filename))?;
        ctx.send_string("Success")
    })
    .unwrap();
    let router = app.build();

    let req = MultipartBuilder::new()
        .field("note", "hello")
        .file("file", "chunli.txt", content)
        .build("/upload");
    let res = router.handle(req);
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(&res), "Success");

    let saved = std::fs::read(dir.path().join("chunli.txt")).unwrap();
    assert_eq!(saved, content);
}

#[test]
fn test_multipart_missing_file_part_reaches_error_handler() {
    let app = App::new();
    app.post("/upload", |ctx: &mut Context| {
        let file = ctx.form_file("file")?;
        let size = file.size();
        ctx.send_string(size.to_string())
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(MultipartBuilder::new().field("file", "not a file").build("/upload"));
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(&res), "no file part named `file`");
}

#[test]
fn test_multipart_text_fields() {
    let app = App::new();
    app.post("/multi", |ctx: &mut Context| {
        let name = ctx.require_form_value("name")?.to_string();
        ctx.send_string(name)
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(MultipartBuilder::new().field("name", "Chun-Li").build("/multi"));
    assert_eq!(body_string(&res), "Chun-Li");

    let res = router.handle(MultipartBuilder::new().build("/multi"));
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(&res), "missing form field `name`");
}

#[test]
fn test_raw_body_json() {
    let app = App::new();
    app.post("/login", |ctx: &mut Context| {
        let request: LoginRequest = serde_json::from_slice(ctx.body())?;
        ctx.send_string(format!(
            "Successfully logged in. Welcome, {}",
            request.username
        ))
    })
    .unwrap();
    let router = app.build();

    let body = r#"{
        "username": "Chun-Li",
        "password": "kungfu"
    }"#;
    let res = router.handle(post_json("/login", body));
    assert_eq!(body_string(&res), "Successfully logged in. Welcome, Chun-Li");
}

#[test]
fn test_body_parser() {
    let app = App::new();
    app.post("/login", |ctx: &mut Context| {
        let request: LoginRequest = ctx.body_parser()?;
        ctx.send_string(format!(
            "Successfully logged in. Welcome, {}",
            request.username
        ))
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(post_json(
        "/login",
        r#"{"username":"Chun-Li","password":"kungfu"}"#,
    ));
    assert_eq!(body_string(&res), "Successfully logged in. Welcome, Chun-Li");

    let res = router.handle(post_form("/login", "username=Chun-Li&password=kungfu"));
    assert_eq!(body_string(&res), "Successfully logged in. Welcome, Chun-Li");

    let res = router.handle(post_json("/login", "{not json"));
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body_string(&res).starts_with("invalid JSON body"));
}

#[test]
fn test_body_parser_unsupported_type() {
    let req = Request::post("/")
        .header(CONTENT_TYPE, "text/csv")
        .body("a,b")
        .unwrap();
    let ctx = Context::from_request(req);
    let err = ctx.body_parser::<LoginRequest>().unwrap_err();
    assert!(matches!(err, DecodeError::UnsupportedContentType(ref ct) if ct == "text/csv"));
}

#[test]
fn test_json_response() {
    let app = App::new();
    app.get("/response_body", |ctx: &mut Context| {
        ctx.json(&LoginRequest {
            username: "test".into(),
            password: "testjugajing".into(),
        })
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(get("/response_body"));
    assert_eq!(res.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(
        body_string(&res),
        r#"{"username":"test","password":"testjugajing"}"#
    );
}

#[test]
fn test_status_and_cookie_builders() {
    let app = App::new();
    app.post("/things", |ctx: &mut Context| {
        ctx.set_cookie("session", "abc")?;
        ctx.set("X-Thing", "1")?;
        ctx.send_status(StatusCode::CREATED)
    })
    .unwrap();
    let router = app.build();

    let res = router.handle(common::request("POST", "/things"));
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(res.headers()[SET_COOKIE], "session=abc; Path=/");
    assert_eq!(res.headers()["x-thing"], "1");
    assert_eq!(body_string(&res), "Created");
}
