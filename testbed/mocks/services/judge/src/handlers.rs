use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::Multipart;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::http::header;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use serde_json::Value;

use crate::fixtures::language_label;
use crate::fixtures::JudgeFixture;
use crate::fixtures::MockUser;
use crate::fixtures::StoredSubmission;

pub const REFRESH_COOKIE: &str = "labRefresh";

fn envelope(status: StatusCode, data: Value, message: &str) -> Response {
    let body = json!({
        "statusCode": status.as_u16(),
        "data": data,
        "message": message,
        "success": status.is_success(),
    });
    (status, Json(body)).into_response()
}

fn ok(data: Value, message: &str) -> Response {
    envelope(StatusCode::OK, data, message)
}

fn fail(status: StatusCode, message: &str) -> Response {
    envelope(status, Value::Null, message)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(name) {
            return parts.next().map(str::to_string);
        }
    }
    None
}

fn authed(fixture: &JudgeFixture, headers: &HeaderMap) -> Result<MockUser, Response> {
    bearer(headers)
        .and_then(|token| fixture.user_for_token(&token))
        .ok_or_else(|| fail(StatusCode::UNAUTHORIZED, "jwt expired"))
}

fn admin(fixture: &JudgeFixture, headers: &HeaderMap) -> Result<MockUser, Response> {
    let user = authed(fixture, headers)?;
    if user.role != "admin" {
        return Err(fail(StatusCode::FORBIDDEN, "Admin access required"));
    }
    Ok(user)
}

fn user_json(user: &MockUser) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "role": user.role,
    })
}

fn submission_json(submission: &StoredSubmission) -> Value {
    json!({
        "id": submission.id,
        "sourceCode": submission.source_code,
        "stdin": submission.stdin,
        "expectedOutput": submission.expected_output,
        "languageId": submission.language_id,
        "status": submission.verdict().status,
    })
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

pub async fn login(
    State(fixture): State<Arc<JudgeFixture>>,
    Json(body): Json<LoginBody>,
) -> Response {
    match fixture.authenticate(&body.email, &body.password) {
        Some(user) => {
            let (access, cookie) = fixture.mint_tokens(&user.id);
            let mut response = ok(
                json!({"user": user_json(&user), "accessToken": access}),
                "Logged in",
            );
            if let Ok(value) =
                format!("{REFRESH_COOKIE}={cookie}; HttpOnly; Path=/").parse()
            {
                response.headers_mut().insert(header::SET_COOKIE, value);
            }
            response
        }
        None => fail(StatusCode::UNAUTHORIZED, "Invalid email or password"),
    }
}

pub async fn register(
    State(fixture): State<Arc<JudgeFixture>>,
    mut multipart: Multipart,
) -> Response {
    let mut username = String::new();
    let mut email = String::new();
    let mut password = String::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name() {
            Some("username") => username = field.text().await.unwrap_or_default(),
            Some("email") => email = field.text().await.unwrap_or_default(),
            Some("password") => password = field.text().await.unwrap_or_default(),
            // The avatar is accepted and dropped; the mock serves no images.
            _ => {
                let _ = field.bytes().await;
            }
        }
    }

    if username.is_empty() || email.is_empty() || password.is_empty() {
        return fail(
            StatusCode::BAD_REQUEST,
            "username, email, and password are required",
        );
    }

    match fixture.register(&username, &email, &password) {
        Ok(user) => ok(user_json(&user), "Registered"),
        Err(message) => fail(StatusCode::CONFLICT, message),
    }
}

pub async fn refresh_token(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
) -> Response {
    let Some(cookie) = cookie_value(&headers, REFRESH_COOKIE) else {
        return fail(StatusCode::FORBIDDEN, "No refresh session");
    };

    match fixture.refresh(&cookie) {
        Some((access, user)) => ok(
            json!({"user": user_json(&user), "accessToken": access}),
            "Refreshed",
        ),
        None => fail(StatusCode::FORBIDDEN, "No refresh session"),
    }
}

pub async fn logout(State(fixture): State<Arc<JudgeFixture>>, headers: HeaderMap) -> Response {
    if let Some(token) = bearer(&headers) {
        let cookie = cookie_value(&headers, REFRESH_COOKIE);
        fixture.revoke(&token, cookie.as_deref());
    }
    ok(Value::Null, "Logged out")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordBody {
    pub old_password: String,
    pub new_password: String,
}

pub async fn reset_password(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
    Json(body): Json<ResetPasswordBody>,
) -> Response {
    let user = match authed(&fixture, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    if fixture.reset_password(&user.id, &body.old_password, &body.new_password) {
        ok(Value::Null, "Password updated")
    } else {
        fail(StatusCode::BAD_REQUEST, "Current password is incorrect")
    }
}

pub async fn reset_avatar(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let user = match authed(&fixture, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut received = false;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("avatar") {
            received = field.bytes().await.map(|bytes| !bytes.is_empty()).unwrap_or(false);
        } else {
            let _ = field.bytes().await;
        }
    }

    if !received {
        return fail(StatusCode::BAD_REQUEST, "Avatar file is required");
    }
    ok(user_json(&user), "Avatar updated")
}

fn default_page() -> u32 {
    1
}

fn default_count() -> u32 {
    12
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_count")]
    pub count: u32,
}

fn paginate<T: Clone>(items: &[T], page: u32, count: u32) -> Vec<T> {
    let start = (page.max(1) - 1) as usize * count as usize;
    items.iter().skip(start).take(count as usize).cloned().collect()
}

pub async fn list_submissions(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    let user = match authed(&fixture, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    let mut all = fixture.submissions_for(&user.id);
    all.reverse();
    let total = all.len() as u64;
    let items: Vec<Value> = paginate(&all, query.page, query.count)
        .iter()
        .map(submission_json)
        .collect();

    ok(
        json!({"submissions": items, "page": query.page, "count": query.count, "total": total}),
        "Submissions",
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub source_code: String,
    #[serde(default)]
    pub stdin: String,
    #[serde(default)]
    pub expected_output: String,
    pub language_id: String,
}

pub async fn submit(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
    Json(body): Json<SubmitBody>,
) -> Response {
    let user = match authed(&fixture, &headers) {
        Ok(user) => user,
        Err(response) => return response,
    };

    if body.source_code.trim().is_empty() {
        return fail(StatusCode::BAD_REQUEST, "Source code is empty!");
    }

    let submission = fixture.add_submission(
        &user,
        &body.source_code,
        &body.stdin,
        &body.expected_output,
        &body.language_id,
    );
    ok(submission_json(&submission), "Submission queued")
}

pub async fn submission_result(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if let Err(response) = authed(&fixture, &headers) {
        return response;
    }

    let Some(submission) = fixture.submission(&id) else {
        return fail(StatusCode::NOT_FOUND, "No such submission");
    };

    let verdict = submission.verdict();
    ok(
        json!({
            "id": submission.id,
            "status": verdict.status,
            "statusId": verdict.status_id,
            "stdout": verdict.stdout,
            "compileOutput": verdict.compile_output,
            "time": verdict.time,
            "memory": verdict.memory,
        }),
        "Result",
    )
}

pub async fn analytics(State(fixture): State<Arc<JudgeFixture>>, headers: HeaderMap) -> Response {
    if let Err(response) = admin(&fixture, &headers) {
        return response;
    }

    let all = fixture.all_submissions();
    let mut by_language: BTreeMap<String, u64> = BTreeMap::new();
    let mut by_status: BTreeMap<String, u64> = BTreeMap::new();
    for submission in &all {
        *by_language
            .entry(language_label(&submission.language_id).to_string())
            .or_default() += 1;
        *by_status
            .entry(submission.verdict().status.to_string())
            .or_default() += 1;
    }

    let buckets = |map: BTreeMap<String, u64>| -> Vec<Value> {
        map.into_iter()
            .map(|(key, count)| json!({"key": key, "count": count}))
            .collect()
    };

    ok(
        json!({
            "total": all.len() as u64,
            "byLanguage": buckets(by_language),
            "byStatus": buckets(by_status),
        }),
        "Analytics",
    )
}

pub async fn analytics_rows(
    State(fixture): State<Arc<JudgeFixture>>,
    headers: HeaderMap,
    Query(query): Query<PageQuery>,
) -> Response {
    if let Err(response) = admin(&fixture, &headers) {
        return response;
    }

    let mut all = fixture.all_submissions();
    all.reverse();
    let total = all.len() as u64;
    let rows: Vec<Value> = paginate(&all, query.page, query.count)
        .iter()
        .map(|submission| {
            let verdict = submission.verdict();
            json!({
                "username": submission.username,
                "languageId": submission.language_id,
                "status": verdict.status,
                "time": verdict.time,
                "memory": verdict.memory,
            })
        })
        .collect();

    ok(
        json!({"rows": rows, "page": query.page, "count": query.count, "total": total}),
        "Analytics rows",
    )
}
