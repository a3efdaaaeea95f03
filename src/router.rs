use crate::activity::ActivityEntry;
use crate::auth::credentials;
use crate::auth::csrf;
use crate::auth::sessions::{
    clear_session_cookie, session_cookie, token_from_cookie_header, SessionData, SessionUser,
};
use crate::auth::token::{generate_token, hash_token};
use crate::errors::{ResultResp, ServerError};
use crate::handlers::{self, flat_json};
use crate::responses::{json_response, json_response_with_cookie};
use crate::state::AppState;
use crate::store::{flatten_record, schema, Collection, DEFAULT_MAX_PAGES};
use crate::validation::{str_field, validate_id};
use astra::Request;
use http::HeaderMap;
use serde_json::{json, Map, Value};
use std::io::Read;

/// Fields an admin may touch through the raw update passthrough. Anything
/// else is stripped (and logged) so system fields cannot be tampered with.
fn editable_fields(collection: Collection) -> &'static [&'static str] {
    match collection {
        Collection::Properties => &["Status", "Notes", "Price", "Address"],
        Collection::Pipeline => &["Loan Status", "Agent", "Notes", "Scheduled Closing", "Sales Price"],
        Collection::TeamMembers => &["Phone", "Email", "Address", "Notes", "Name", "Role", "Status"],
        Collection::Schedule => &["Date", "Time", "Notes", "Status", "Attendees"],
        // Closed deals are an archive; only annotations may change.
        Collection::ClosedDeals => &["Notes"],
        Collection::ActivityLog => &[],
    }
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Rate-limit key. Behind a proxy the first X-Forwarded-For hop is the
/// client; bare deployments fall back to X-Real-IP.
fn client_key(headers: &HeaderMap) -> String {
    let from_header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };
    from_header("x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| from_header("x-real-ip").map(String::from))
        .unwrap_or_else(|| "unknown".to_string())
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn require_user(session: &SessionData) -> Result<&SessionUser, ServerError> {
    session
        .user
        .as_ref()
        .ok_or_else(|| ServerError::Unauthorized("Authentication required".into()))
}

fn require_admin(session: &SessionData) -> Result<&SessionUser, ServerError> {
    let user = require_user(session)?;
    if !user.is_admin() {
        return Err(ServerError::Forbidden("Admin access required".into()));
    }
    Ok(user)
}

pub fn handle(req: Request, state: &AppState) -> ResultResp {
    let (parts, body) = req.into_parts();
    let method = parts.method.as_str().to_string();
    let path = parts.uri.path().to_string();
    let headers = parts.headers;
    let now = now_unix();
    let client = client_key(&headers);

    // General API limit applies to everything under /api.
    if !state.api_limiter.check(&client, now).allowed {
        return Err(ServerError::TooManyRequests("Too many requests".into()));
    }

    // Parse the JSON body for mutating methods; an empty body is `{}`.
    let payload: Value = if csrf::is_mutating(&method) {
        let mut raw = String::new();
        let mut body = body;
        body.reader()
            .read_to_string(&mut raw)
            .map_err(|_| ServerError::BadRequest("Unreadable request body".into()))?;
        if raw.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&raw)
                .map_err(|_| ServerError::BadRequest("Invalid JSON body".into()))?
        }
    } else {
        json!({})
    };

    // Resolve the session referenced by the cookie, if any. A cookie that
    // matches no stored session is treated exactly like no cookie, so a
    // client-chosen value can never become a session key.
    let cookie_token = header(&headers, "cookie").and_then(token_from_cookie_header);
    let loaded = match cookie_token.map(hash_token) {
        Some(hash) => state.sessions.load(&hash, now)?.map(|data| (hash, data)),
        None => None,
    };
    let session_hash = loaded.as_ref().map(|(hash, _)| *hash);
    let session: SessionData = loaded.map(|(_, data)| data).unwrap_or_default();

    // CSRF defenses for mutating requests: origin gate always, session
    // token once a logged-in session exists. Pre-auth paths have no session
    // token yet, so only the origin gate applies to them.
    if csrf::is_mutating(&method) {
        csrf::check_origin(
            header(&headers, "origin"),
            header(&headers, "referer"),
            &state.config.allowed_origins,
        )?;
        if !csrf::PRE_AUTH_PATHS.contains(&path.as_str()) {
            csrf::check_session_token(&session, header(&headers, "x-csrf-token"), &payload)?;
        }
    }

    match (method.as_str(), path.as_str()) {
        ("GET", "/api/health") => json_response(200, &json!({ "status": "ok" })),

        ("GET", "/api/csrf-token") => {
            let mut session = session;
            let csrf_token = match &session.csrf_token {
                Some(token) => token.clone(),
                None => {
                    let token = generate_token();
                    session.csrf_token = Some(token.clone());
                    token
                }
            };
            match session_hash {
                // Existing session: persist the (possibly fresh) token.
                Some(hash) => {
                    state.sessions.save(&hash, &session, now)?;
                    json_response(200, &json!({ "csrfToken": csrf_token }))
                }
                // First contact: mint the session and hand out its cookie.
                None => {
                    let raw = generate_token();
                    state.sessions.save(&hash_token(&raw), &session, now)?;
                    json_response_with_cookie(
                        200,
                        &json!({ "csrfToken": csrf_token }),
                        &session_cookie(&raw),
                    )
                }
            }
        }

        ("POST", "/api/auth/login") => {
            if !state.auth_limiter.check(&client, now).allowed {
                return Err(ServerError::TooManyRequests(
                    "Too many login attempts, please try again later".into(),
                ));
            }

            let (Some(email), Some(password)) =
                (str_field(&payload, "email"), str_field(&payload, "password"))
            else {
                return Err(ServerError::BadRequest("Email and password required".into()));
            };

            let user = credentials::login(state.store.as_ref(), state.verifier.as_ref(), email, password)?;
            // Successful logins do not count against the limiter.
            state.auth_limiter.forgive(&client);

            // Rotate the session token on privilege change; carry the CSRF
            // token over so a pre-login fetch stays valid.
            if let Some(hash) = &session_hash {
                state.sessions.destroy(hash)?;
            }
            let raw = generate_token();
            let fresh = SessionData {
                user: Some(user.clone()),
                csrf_token: session.csrf_token.clone(),
            };
            state.sessions.save(&hash_token(&raw), &fresh, now)?;

            state.activity.record(&ActivityEntry {
                action: &format!("{} logged in", user.full_name),
                actor: &user.full_name,
                entity_type: Some("System"),
                action_type: Some("Login"),
                ..Default::default()
            });

            json_response_with_cookie(200, &json!({ "user": user }), &session_cookie(&raw))
        }

        ("POST", "/api/auth/check-email") => {
            let email = str_field(&payload, "email")
                .ok_or_else(|| ServerError::BadRequest("Email is required".into()))?;
            let status = credentials::check_email(state.store.as_ref(), email)?;
            let mut body = json!({ "status": status.status, "message": status.message });
            if let Some(has_password) = status.has_password {
                body["hasPassword"] = json!(has_password);
            }
            json_response(200, &body)
        }

        ("POST", "/api/auth/create-password") => {
            let (Some(email), Some(password)) =
                (str_field(&payload, "email"), str_field(&payload, "password"))
            else {
                return Err(ServerError::BadRequest("Email and password required".into()));
            };
            let user = credentials::create_password(
                state.store.as_ref(),
                email,
                password,
                str_field(&payload, "confirmPassword"),
            )?;
            // No session yet; the client logs in with the new password.
            json_response(
                200,
                &json!({ "message": "Password created successfully", "user": user }),
            )
        }

        ("POST", "/api/auth/logout") => {
            if let Some(hash) = &session_hash {
                state.sessions.destroy(hash)?;
            }
            if let Some(user) = &session.user {
                state.activity.record(&ActivityEntry {
                    action: &format!("{} logged out", user.full_name),
                    actor: &user.full_name,
                    entity_type: Some("System"),
                    action_type: Some("Logout"),
                    ..Default::default()
                });
            }
            json_response_with_cookie(
                200,
                &json!({ "message": "Logged out successfully" }),
                &clear_session_cookie(),
            )
        }

        ("GET", "/api/auth/check") => match &session.user {
            Some(user) => json_response(200, &json!({ "user": user })),
            None => Err(ServerError::Unauthorized("Not authenticated".into())),
        },

        ("POST", "/api/databases/actions") => {
            let user = require_user(&session)?;
            let action = str_field(&payload, "action")
                .ok_or_else(|| ServerError::BadRequest("action required".into()))?;
            let actor = if user.full_name.is_empty() {
                &user.email
            } else {
                &user.full_name
            };
            let result = handlers::dispatch(state, actor, action, &payload)?;
            json_response(200, &result)
        }

        ("POST", "/api/databases/reconcile") => {
            require_admin(&session)?;
            let result = handlers::reconcile::run(state)?;
            json_response(200, &result)
        }

        _ => route_databases(state, &session, &method, &path, &payload),
    }
}

/// The `/api/databases/:key[/:id]` passthrough routes.
fn route_databases(
    state: &AppState,
    session: &SessionData,
    method: &str,
    path: &str,
    payload: &Value,
) -> ResultResp {
    let rest = path
        .strip_prefix("/api/databases/")
        .ok_or(ServerError::NotFound)?;
    let mut segments = rest.split('/').filter(|s| !s.is_empty());
    let key = segments.next().ok_or(ServerError::NotFound)?;
    let id = segments.next();
    if segments.next().is_some() {
        return Err(ServerError::NotFound);
    }
    let collection = Collection::from_key(key).map_err(|_| ServerError::NotFound)?;

    match (method, id) {
        ("GET", None) => {
            require_user(session)?;
            let pages = state
                .store
                .query(collection, None, None, DEFAULT_MAX_PAGES)?;
            let records: Vec<Value> = pages
                .iter()
                .map(|page| {
                    let mut flat = flatten_record(page);
                    schema::canonicalize(collection, &mut flat);
                    Value::Object(flat)
                })
                .collect();
            json_response(200, &Value::Array(records))
        }

        ("POST", None) => {
            require_admin(session)?;
            let props = payload
                .get("properties")
                .filter(|p| p.is_object())
                .ok_or_else(|| ServerError::BadRequest("Properties required".into()))?;
            let created = state.store.create(collection, props.clone())?;
            json_response(
                200,
                &json!({ "success": true, "data": flat_json(collection, &created) }),
            )
        }

        ("PUT", Some(raw_id)) => {
            require_admin(session)?;
            let page_id = validate_id(Some(raw_id), "pageId")?;
            let props = payload
                .get("properties")
                .and_then(Value::as_object)
                .ok_or_else(|| ServerError::BadRequest("Properties required".into()))?;

            let allowed = editable_fields(collection);
            if allowed.is_empty() {
                return Err(ServerError::Forbidden(
                    "Editing not allowed for this database".into(),
                ));
            }

            let mut sanitized = Map::new();
            let mut blocked = Vec::new();
            for (field, value) in props {
                if allowed.contains(&field.as_str()) {
                    sanitized.insert(field.clone(), value.clone());
                } else {
                    blocked.push(field.clone());
                }
            }
            if !blocked.is_empty() {
                tracing::warn!(
                    collection = collection.key(),
                    blocked = blocked.join(", "),
                    "blocked field update attempt"
                );
            }
            if sanitized.is_empty() {
                return Err(ServerError::BadRequest("No valid fields to update".into()));
            }

            let updated = state
                .store
                .update(page_id.as_str(), Value::Object(sanitized))?;
            json_response(
                200,
                &json!({ "success": true, "data": flat_json(collection, &updated) }),
            )
        }

        ("DELETE", Some(raw_id)) => {
            require_admin(session)?;
            let page_id = validate_id(Some(raw_id), "pageId")?;
            state.store.archive(page_id.as_str())?;
            json_response(200, &json!({ "success": true, "message": "Record archived" }))
        }

        _ => Err(ServerError::NotFound),
    }
}
