use std::{collections::BTreeMap, collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

/// Header a request must carry to pass `/auth/check`.
pub const SIGNATURE_HEADER: &str = "x-cb-access-signature";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: Uuid,
    pub product_id: String,
    pub side: String,
    pub size: String,
    pub status: String,
}

#[derive(Deserialize)]
pub struct CreateOrder {
    pub product_id: String,
    pub side: String,
    pub size: String,
}

#[derive(Deserialize)]
pub struct UpdateOrder {
    pub size: Option<String>,
    pub status: Option<String>,
}

/// What `/echo` saw.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub id: Uuid,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}

pub type Db = Arc<RwLock<HashMap<Uuid, Order>>>;

type Failure = (StatusCode, Json<ErrorBody>);

fn failure(status: StatusCode, message: &str) -> Failure {
    (
        status,
        Json(ErrorBody {
            message: message.to_string(),
        }),
    )
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/orders", post(create_order))
        .route(
            "/orders/{id}",
            get(get_order)
                .put(update_order)
                .patch(update_order)
                .delete(delete_order),
        )
        .route("/echo", any(echo))
        .route("/echo/{*rest}", any(echo))
        .route("/status/{code}", any(status))
        .route("/error/json", any(json_error))
        .route("/error/plain", any(plain_error))
        .route("/auth/check", get(auth_check))
        .route("/slow", get(slow))
        .route("/ws/feed", get(ws_feed))
        .route("/ws/echo", get(ws_echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn create_order(
    State(db): State<Db>,
    Json(input): Json<CreateOrder>,
) -> (StatusCode, Json<Order>) {
    let order = Order {
        id: Uuid::new_v4(),
        product_id: input.product_id,
        side: input.side,
        size: input.size,
        status: "OPEN".to_string(),
    };
    db.write().await.insert(order.id, order.clone());
    tracing::debug!(id = %order.id, "order created");
    (StatusCode::CREATED, Json(order))
}

async fn get_order(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Order>, Failure> {
    let orders = db.read().await;
    orders
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "order not found"))
}

async fn update_order(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateOrder>,
) -> Result<Json<Order>, Failure> {
    let mut orders = db.write().await;
    let order = orders
        .get_mut(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "order not found"))?;
    if let Some(size) = input.size {
        order.size = size;
    }
    if let Some(status) = input.status {
        order.status = status;
    }
    Ok(Json(order.clone()))
}

async fn delete_order(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<Order>, Failure> {
    let mut orders = db.write().await;
    let mut order = orders
        .remove(&id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "order not found"))?;
    order.status = "CANCELLED".to_string();
    Ok(Json(order))
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect();
    Json(Echo {
        id: Uuid::new_v4(),
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// Respond with the status in the path and a structured error body.
async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => (
            status,
            Json(ErrorBody {
                message: format!("status {code}"),
            }),
        )
            .into_response(),
        Err(_) => failure(StatusCode::BAD_REQUEST, "invalid status code").into_response(),
    }
}

async fn json_error() -> Failure {
    failure(StatusCode::BAD_REQUEST, "bad request")
}

async fn plain_error() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "oops")
}

async fn auth_check(headers: HeaderMap) -> Result<Json<serde_json::Value>, Failure> {
    if headers.contains_key(SIGNATURE_HEADER) {
        Ok(Json(serde_json::json!({ "authenticated": true })))
    } else {
        Err(failure(StatusCode::UNAUTHORIZED, "missing signature"))
    }
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(2)).await;
    "{}"
}

#[derive(Deserialize)]
struct FeedParams {
    #[serde(default)]
    count: usize,
    #[serde(default)]
    binary: bool,
}

async fn ws_feed(Query(params): Query<FeedParams>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| feed(socket, params.count, params.binary))
}

/// Send `count` frames, then close and wait for the client's close reply.
async fn feed(mut socket: WebSocket, count: usize, binary: bool) {
    for i in 0..count {
        let payload = format!("message-{i}");
        let message = if binary {
            Message::Binary(payload.into_bytes().into())
        } else {
            Message::Text(payload.into())
        };
        if socket.send(message).await.is_err() {
            return;
        }
    }
    if socket.send(Message::Close(None)).await.is_err() {
        return;
    }
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn ws_echo(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(echo_frames)
}

async fn echo_frames(mut socket: WebSocket) {
    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(message).await.is_err() {
                    return;
                }
            }
            Message::Close(_) => return,
            _ => {}
        }
    }
}
