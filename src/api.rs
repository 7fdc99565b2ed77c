use crate::course::Course;
use crate::error::ApiError;
use crate::profile::Profile;
use crate::session::Session;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use url::Url;

#[derive(Debug, Serialize)]
pub struct Credentials<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Serialize)]
struct FeedbackRequest<'a> {
    text: &'a str,
}

/// Acknowledgement returned by write endpoints.
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Ack {
    #[serde(default)]
    pub message: Option<String>,
}

/// Trait for backend clients to allow mocking and abstraction
pub trait CourseApi {
    fn login(&self, email: &str, password: &str) -> Result<Session, ApiError>;
    fn register(&self, email: &str, password: &str) -> Result<Session, ApiError>;
    fn get_profile(&self, token: &str) -> Result<Profile, ApiError>;
    fn save_profile(&self, token: &str, profile: &Profile) -> Result<Ack, ApiError>;
    fn recommendations(&self, token: &str) -> Result<Vec<Course>, ApiError>;
    fn submit_feedback(&self, token: &str, text: &str) -> Result<Ack, ApiError>;
    fn course_details(&self, token: &str, course_id: &str) -> Result<Course, ApiError>;
}

pub struct Client {
    base_url: String,
    agent: ureq::Agent,
}

impl Client {
    pub fn new(base_url: &str, timeout_ms: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: ureq::AgentBuilder::new()
                .timeout(Duration::from_millis(timeout_ms))
                .build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: &str, path: &str, token: Option<&str>) -> Result<ureq::Request, ApiError> {
        self.request_url(method, &self.url(path), token)
    }

    fn request_url(&self, method: &str, url: &str, token: Option<&str>) -> Result<ureq::Request, ApiError> {
        if let Some(token) = token {
            if token.is_empty() {
                tracing::error!(method, path = url, "no token for authenticated request");
                return Err(ApiError::MissingToken);
            }
        }

        tracing::debug!(method, url = %url, bearer = token.is_some(), "API request");

        let mut req = self.agent.request(method, url);
        if let Some(token) = token {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }
        Ok(req)
    }

    fn get<T: DeserializeOwned>(&self, path: &str, token: &str, fallback: &str) -> Result<T, ApiError> {
        self.get_url(&self.url(path), token, fallback)
    }

    fn get_url<T: DeserializeOwned>(&self, url: &str, token: &str, fallback: &str) -> Result<T, ApiError> {
        let req = self.request_url("GET", url, Some(token))?;
        let resp = req.call().map_err(|e| classify(e, fallback, true))?;
        decode(resp)
    }

    fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
        fallback: &str,
    ) -> Result<T, ApiError> {
        let req = self
            .request("POST", path, token)?
            .set("Content-Type", "application/json");
        let body = serde_json::to_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        let resp = req
            .send_json(body)
            .map_err(|e| classify(e, fallback, token.is_some()))?;
        decode(resp)
    }
}

impl CourseApi for Client {
    fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let session: Session = self.post(
            "/api/login",
            None,
            &Credentials { email, password },
            "Login failed",
        )?;
        tracing::info!(email = %session.email, "login successful");
        Ok(session)
    }

    fn register(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let session: Session = self.post(
            "/api/register",
            None,
            &Credentials { email, password },
            "Registration failed",
        )?;
        tracing::info!(email = %session.email, "registration successful");
        Ok(session)
    }

    fn get_profile(&self, token: &str) -> Result<Profile, ApiError> {
        self.get("/api/profile", token, "Failed to get profile")
    }

    fn save_profile(&self, token: &str, profile: &Profile) -> Result<Ack, ApiError> {
        self.post("/api/profile", Some(token), profile, "Failed to save profile")
    }

    fn recommendations(&self, token: &str) -> Result<Vec<Course>, ApiError> {
        let value: Value = self.get("/api/recommendations", token, "Failed to get recommendations")?;
        parse_course_list(value)
    }

    fn submit_feedback(&self, token: &str, text: &str) -> Result<Ack, ApiError> {
        self.post(
            "/api/feedback",
            Some(token),
            &FeedbackRequest { text },
            "Failed to submit feedback",
        )
    }

    fn course_details(&self, token: &str, course_id: &str) -> Result<Course, ApiError> {
        let url = self.course_url(course_id)?;
        self.get_url(url.as_str(), token, "Failed to get course details")
    }
}

impl Client {
    /// `/api/courses/{id}` with the id percent-encoded as a single segment.
    fn course_url(&self, course_id: &str) -> Result<Url, ApiError> {
        let id = course_id.trim();
        if matches!(id, "" | "." | "..") {
            return Err(ApiError::InvalidRequest(format!(
                "'{}' is not a course id",
                course_id
            )));
        }
        let mut url = Url::parse(&self.url("/api/courses"))
            .map_err(|e| ApiError::InvalidRequest(format!("bad base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidRequest("base URL cannot have a path".to_string()))?
            .push(id);
        Ok(url)
    }
}

fn decode<T: DeserializeOwned>(resp: ureq::Response) -> Result<T, ApiError> {
    resp.into_json::<T>()
        .map_err(|e| ApiError::Decode(e.to_string()))
}

/// Turn a ureq failure into an [`ApiError`].
///
/// The body's `error` field wins when present. A 401 only means "session
/// expired" for calls that carried a bearer token; for sign-in it is an
/// ordinary credential failure.
fn classify(err: ureq::Error, fallback: &str, authenticated: bool) -> ApiError {
    match err {
        ureq::Error::Status(code, resp) => {
            let reason = resp.status_text().to_string();
            let body = resp.into_string().unwrap_or_default();
            let message = server_message(&body)
                .unwrap_or_else(|| format!("{}: {} {}", fallback, code, reason));
            tracing::warn!(status = code, "API error: {}", message);

            if code == 401 && authenticated {
                ApiError::Unauthorized(message)
            } else {
                ApiError::Server {
                    status: code,
                    message,
                }
            }
        }
        ureq::Error::Transport(t) => ApiError::Transport(t.to_string()),
    }
}

fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Stored recommendations come back either as a JSON array or as that array
/// serialized into a string.
fn parse_course_list(value: Value) -> Result<Vec<Course>, ApiError> {
    let value = match value {
        Value::String(s) => {
            serde_json::from_str::<Value>(&s).map_err(|e| ApiError::Decode(e.to_string()))?
        }
        Value::Null => return Ok(Vec::new()),
        other => other,
    };
    serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;

    /// A request as seen by the test server.
    #[derive(Debug)]
    struct Seen {
        request_line: String,
        authorization: Option<String>,
        body: String,
    }

    /// Serve one canned response per connection, reporting what was received.
    fn serve(responses: Vec<(u16, &'static str, String)>) -> (String, mpsc::Receiver<Seen>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for (status, reason, body) in responses {
                let Ok((mut stream, _)) = listener.accept() else {
                    return;
                };
                let seen = read_request(&mut stream);
                let _ = tx.send(seen);
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes());
            }
        });

        (format!("http://127.0.0.1:{}", port), rx)
    }

    fn read_request(stream: &mut std::net::TcpStream) -> Seen {
        let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
        let mut data = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(end) = text.find("\r\n\r\n") {
                let length = text[..end]
                    .lines()
                    .find_map(|l| {
                        let (k, v) = l.split_once(':')?;
                        k.eq_ignore_ascii_case("content-length")
                            .then(|| v.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= end + 4 + length {
                    break;
                }
            }
        }

        let text = String::from_utf8_lossy(&data).to_string();
        let (head, body) = text.split_once("\r\n\r\n").unwrap_or((text.as_str(), ""));
        let mut lines = head.lines();
        let request_line = lines.next().unwrap_or_default().to_string();
        let authorization = lines.find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("authorization")
                .then(|| v.trim().to_string())
        });
        Seen {
            request_line,
            authorization,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_login_posts_credentials() {
        let (url, rx) = serve(vec![(
            200,
            "OK",
            r#"{"id": 5, "email": "ada@example.com", "name": null, "token": "a.b.c"}"#.to_string(),
        )]);
        let client = Client::new(&url, 5_000);

        let session = client.login("ada@example.com", "pw").unwrap();
        assert_eq!(session.id, "5");
        assert_eq!(session.token, "a.b.c");
        assert_eq!(session.name, None);

        let seen = rx.recv().unwrap();
        assert_eq!(seen.request_line, "POST /api/login HTTP/1.1");
        assert_eq!(seen.authorization, None);
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body, serde_json::json!({"email": "ada@example.com", "password": "pw"}));
    }

    #[test]
    fn test_login_401_is_not_session_expiry() {
        let (url, _rx) = serve(vec![(
            401,
            "Unauthorized",
            r#"{"error": "Invalid email or password"}"#.to_string(),
        )]);
        let client = Client::new(&url, 5_000);

        match client.login("ada@example.com", "nope") {
            Err(ApiError::Server { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid email or password");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_authenticated_call_sends_bearer() {
        let (url, rx) = serve(vec![(
            200,
            "OK",
            r#"[{"id": 1, "Course Title": "Intro to Python", "Rating": 4.5}]"#.to_string(),
        )]);
        let client = Client::new(&url, 5_000);

        let courses = client.recommendations("tok").unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].display_title(), "Intro to Python");

        let seen = rx.recv().unwrap();
        assert_eq!(seen.request_line, "GET /api/recommendations HTTP/1.1");
        assert_eq!(seen.authorization.as_deref(), Some("Bearer tok"));
    }

    #[test]
    fn test_unauthorized_on_authenticated_call() {
        let (url, _rx) = serve(vec![(
            401,
            "Unauthorized",
            r#"{"error": "Token has expired"}"#.to_string(),
        )]);
        let client = Client::new(&url, 5_000);

        let err = client.get_profile("tok").unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_error_without_json_body_uses_fallback() {
        let (url, _rx) = serve(vec![(500, "Internal Server Error", "oops".to_string())]);
        let client = Client::new(&url, 5_000);

        let err = client.submit_feedback("tok", "great").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to submit feedback: 500 Internal Server Error"
        );
    }

    #[test]
    fn test_missing_token_fails_before_request() {
        // Nothing listens here; a request would be a transport error instead.
        let client = Client::new("http://127.0.0.1:9", 1_000);
        assert!(matches!(client.get_profile(""), Err(ApiError::MissingToken)));
        assert!(matches!(
            client.save_profile("", &Profile::default()),
            Err(ApiError::MissingToken)
        ));
        assert!(matches!(
            client.course_details("", "3"),
            Err(ApiError::MissingToken)
        ));
    }

    #[test]
    fn test_course_details_path_and_feedback_body() {
        let (url, rx) = serve(vec![
            (200, "OK", r#"{"id": 3, "Course Title": "SQL"}"#.to_string()),
            (200, "OK", r#"{"message": "Feedback submitted successfully"}"#.to_string()),
        ]);
        let client = Client::new(&format!("{}/", url), 5_000);

        let course = client.course_details("tok", "3").unwrap();
        assert_eq!(course.id.as_deref(), Some("3"));
        assert_eq!(rx.recv().unwrap().request_line, "GET /api/courses/3 HTTP/1.1");

        let ack = client.submit_feedback("tok", "more SQL please").unwrap();
        assert_eq!(ack.message.as_deref(), Some("Feedback submitted successfully"));
        let seen = rx.recv().unwrap();
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body, serde_json::json!({"text": "more SQL please"}));
    }

    #[test]
    fn test_register_then_save_profile() {
        let (url, rx) = serve(vec![
            (
                201,
                "Created",
                r#"{"id": "u-9", "email": "new@example.com", "token": "x.y.z"}"#.to_string(),
            ),
            (200, "OK", r#"{"message": "Profile updated successfully"}"#.to_string()),
        ]);
        let client = Client::new(&url, 5_000);

        let session = client.register("new@example.com", "pw").unwrap();
        assert_eq!(session.id, "u-9");
        assert_eq!(rx.recv().unwrap().request_line, "POST /api/register HTTP/1.1");

        let mut profile = Profile::default();
        profile.set("skills", "python, sql");
        let ack = client.save_profile(&session.token, &profile).unwrap();
        assert_eq!(ack.message.as_deref(), Some("Profile updated successfully"));

        let seen = rx.recv().unwrap();
        assert_eq!(seen.request_line, "POST /api/profile HTTP/1.1");
        assert_eq!(seen.authorization.as_deref(), Some("Bearer x.y.z"));
        let body: Value = serde_json::from_str(&seen.body).unwrap();
        assert_eq!(body, serde_json::json!({"skills": "python, sql"}));
    }

    #[test]
    fn test_course_id_stays_one_path_segment() {
        let (url, rx) = serve(vec![
            (404, "Not Found", r#"{"error": "Course not found"}"#.to_string()),
            (404, "Not Found", r#"{"error": "Course not found"}"#.to_string()),
        ]);
        let client = Client::new(&url, 5_000);

        let err = client.course_details("tok", "../profile").unwrap_err();
        assert_eq!(err.to_string(), "Course not found");
        assert_eq!(
            rx.recv().unwrap().request_line,
            "GET /api/courses/..%2Fprofile HTTP/1.1"
        );

        client.course_details("tok", "a?b#c").unwrap_err();
        assert_eq!(
            rx.recv().unwrap().request_line,
            "GET /api/courses/a%3Fb%23c HTTP/1.1"
        );
    }

    #[test]
    fn test_dot_course_ids_rejected_locally() {
        let client = Client::new("http://127.0.0.1:9", 1_000);
        for id in ["..", ".", "  "] {
            assert!(matches!(
                client.course_details("tok", id),
                Err(ApiError::InvalidRequest(_))
            ));
        }
    }

    #[test]
    fn test_parse_course_list_variants() {
        let list = serde_json::json!([{"Course Title": "A"}]);
        assert_eq!(parse_course_list(list).unwrap().len(), 1);

        let encoded = Value::String(r#"[{"Course Title": "A"}, {"Course Title": "B"}]"#.to_string());
        assert_eq!(parse_course_list(encoded).unwrap().len(), 2);

        assert!(parse_course_list(Value::Null).unwrap().is_empty());
        assert!(parse_course_list(serde_json::json!({"error": "x"})).is_err());
    }

    #[test]
    fn test_server_message() {
        assert_eq!(server_message(r#"{"error":"bad"}"#).as_deref(), Some("bad"));
        assert_eq!(server_message(r#"{"error":""}"#), None);
        assert_eq!(server_message(r#"{"message":"x"}"#), None);
        assert_eq!(server_message("<html>"), None);
    }
}
