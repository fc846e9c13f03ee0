use crate::{
    Result,
    app::{
        call_source::PendingCall,
        query_api::{
            LeaderboardSettings,
            Query,
            QueryAPI,
        },
        snapshot_storage::RecordedEvent,
    },
    calls::{
        Call,
        CallReceipt,
        CallStatus,
    },
};
use actix_cors::Cors;
use actix_web::{
    App,
    HttpRequest,
    HttpResponse,
    HttpServer,
    dev::ServerHandle,
    error::{
        ErrorBadRequest,
        ErrorForbidden,
        ErrorInternalServerError,
        ErrorNotFound,
        ErrorUnauthorized,
    },
    http::{
        StatusCode,
        header,
    },
    web,
};
use anyhow::{
    Context,
    anyhow,
};
use leaderboard::{
    PlayerAddress,
    PlayerScore,
    Score,
    ScoreEntry,
    Submission,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    net::TcpListener,
    str::FromStr,
    thread::JoinHandle,
};
use tokio::sync::{
    mpsc,
    oneshot,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LeaderboardDto {
    pub entries: Vec<ScoreEntry>,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LengthDto {
    pub length: usize,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerScoreDto {
    pub player: PlayerAddress,
    pub score: PlayerScore,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PositionDto {
    pub player: PlayerAddress,
    pub position: usize,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerDto {
    pub owner: PlayerAddress,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventsDto {
    pub events: Vec<RecordedEvent>,
    pub height: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubmitRequest {
    pub player: PlayerAddress,
    pub score: Score,
    pub player_name: String,
    #[serde(default)]
    pub fid: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MinScoreRequest {
    pub caller: PlayerAddress,
    pub min_score_to_submit: Score,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferOwnershipRequest {
    pub caller: PlayerAddress,
    pub new_owner: PlayerAddress,
}

/// Bearer token that admin routes require. Without one the admin routes are
/// closed.
#[derive(Debug, Clone, Default)]
struct AdminToken(Option<String>);

#[derive(Debug, Clone, Deserialize)]
struct EventsParams {
    #[serde(default)]
    since: u64,
}

pub struct ActixQueryApi {
    receiver: mpsc::Receiver<Query>,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl ActixQueryApi {
    /// Serve reads on a fresh query channel and forward writes to `calls`.
    /// Admin calls are only forwarded when they carry `admin_token` as a
    /// bearer credential.
    pub async fn new(
        port: Option<u16>,
        admin_token: Option<String>,
        calls: mpsc::Sender<PendingCall>,
    ) -> Result<Self> {
        let (sender, receiver) = mpsc::channel(16);

        let listener = TcpListener::bind(("127.0.0.1", port.unwrap_or(0)))
            .context("failed to bind HTTP listener for query API")?;
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;
        let base_url = format!("http://{}", address);

        tracing::info!("query API listening on {}", base_url);
        if admin_token.is_none() {
            tracing::warn!("no admin token configured; admin routes are disabled");
        }
        let admin_token = AdminToken(admin_token);

        let server = HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(sender.clone()))
                .app_data(web::Data::new(calls.clone()))
                .app_data(web::Data::new(admin_token.clone()))
                .route("/leaderboard", web::get().to(handle_leaderboard))
                .route("/leaderboard/top/{count}", web::get().to(handle_top_scores))
                .route("/leaderboard/length", web::get().to(handle_length))
                .route("/player/{address}", web::get().to(handle_player_score))
                .route(
                    "/player/{address}/position",
                    web::get().to(handle_player_position),
                )
                .route("/owner", web::get().to(handle_owner))
                .route("/config", web::get().to(handle_config))
                .route("/events", web::get().to(handle_events))
                .route("/submit", web::post().to(handle_submit))
                .route("/admin/min-score", web::post().to(handle_set_min_score))
                .route("/admin/owner", web::post().to(handle_transfer_ownership))
        })
        .listen(listener)
        .context("failed to start Actix server")?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Ok(Self {
            receiver,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl QueryAPI for ActixQueryApi {
    async fn query(&mut self) -> Result<Query> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow!("query server closed"))
    }
}

impl Drop for ActixQueryApi {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

type QuerySender = web::Data<mpsc::Sender<Query>>;
type CallSender = web::Data<mpsc::Sender<PendingCall>>;

async fn ask<T>(
    sender: &QuerySender,
    build: impl FnOnce(oneshot::Sender<T>) -> Query,
) -> actix_web::Result<T> {
    let (response_sender, response_receiver) = oneshot::channel();
    sender
        .get_ref()
        .send(build(response_sender))
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward leaderboard query"))?;
    response_receiver
        .await
        .map_err(|_| ErrorInternalServerError("leaderboard query responder dropped"))
}

async fn apply(calls: &CallSender, call: Call) -> actix_web::Result<HttpResponse> {
    let (pending, receipt) = PendingCall::with_responder(call);
    calls
        .get_ref()
        .send(pending)
        .await
        .map_err(|_| ErrorInternalServerError("unable to forward leaderboard call"))?;
    let receipt: CallReceipt = receipt
        .await
        .map_err(|_| ErrorInternalServerError("leaderboard call responder dropped"))?;
    let status = match receipt.status {
        CallStatus::Rejected => StatusCode::UNPROCESSABLE_ENTITY,
        CallStatus::Accepted | CallStatus::Ignored => StatusCode::OK,
    };
    Ok(HttpResponse::build(status).json(receipt))
}

fn authorize(request: &HttpRequest, token: &AdminToken) -> actix_web::Result<()> {
    let Some(expected) = token.0.as_deref() else {
        return Err(ErrorForbidden("admin routes are disabled"));
    };
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    match presented {
        Some(presented) if presented == expected => Ok(()),
        _ => {
            tracing::warn!("admin request without a valid token");
            Err(ErrorUnauthorized("missing or invalid admin token"))
        }
    }
}

fn parse_address(raw: &str) -> actix_web::Result<PlayerAddress> {
    PlayerAddress::from_str(raw).map_err(ErrorBadRequest)
}

fn now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default()
}

async fn handle_leaderboard(
    sender: QuerySender,
) -> actix_web::Result<web::Json<LeaderboardDto>> {
    tracing::debug!("received leaderboard request");
    let (entries, height) = ask(&sender, Query::Leaderboard).await?;
    Ok(web::Json(LeaderboardDto { entries, height }))
}

async fn handle_top_scores(
    sender: QuerySender,
    count: web::Path<usize>,
) -> actix_web::Result<web::Json<LeaderboardDto>> {
    let count = count.into_inner();
    tracing::debug!("received top {count} request");
    let (entries, height) =
        ask(&sender, |responder| Query::top_scores(count, responder)).await?;
    Ok(web::Json(LeaderboardDto { entries, height }))
}

async fn handle_length(sender: QuerySender) -> actix_web::Result<web::Json<LengthDto>> {
    let settings = ask(&sender, Query::Settings).await?;
    Ok(web::Json(LengthDto {
        length: settings.length,
        height: settings.height,
    }))
}

async fn handle_player_score(
    sender: QuerySender,
    address: web::Path<String>,
) -> actix_web::Result<web::Json<PlayerScoreDto>> {
    let player = parse_address(&address)?;
    tracing::debug!("received score request for {player}");
    let (score, height) =
        ask(&sender, |responder| Query::player_score(player, responder)).await?;
    let score = score.ok_or_else(|| ErrorNotFound(format!("no score for {player}")))?;
    Ok(web::Json(PlayerScoreDto {
        player,
        score,
        height,
    }))
}

async fn handle_player_position(
    sender: QuerySender,
    address: web::Path<String>,
) -> actix_web::Result<web::Json<PositionDto>> {
    let player = parse_address(&address)?;
    let (position, height) =
        ask(&sender, |responder| Query::player_position(player, responder)).await?;
    Ok(web::Json(PositionDto {
        player,
        position,
        height,
    }))
}

async fn handle_owner(sender: QuerySender) -> actix_web::Result<web::Json<OwnerDto>> {
    let settings = ask(&sender, Query::Settings).await?;
    Ok(web::Json(OwnerDto {
        owner: settings.owner,
        height: settings.height,
    }))
}

async fn handle_config(
    sender: QuerySender,
) -> actix_web::Result<web::Json<LeaderboardSettings>> {
    Ok(web::Json(ask(&sender, Query::Settings).await?))
}

async fn handle_events(
    sender: QuerySender,
    params: web::Query<EventsParams>,
) -> actix_web::Result<web::Json<EventsDto>> {
    let since = params.since;
    let (events, height) =
        ask(&sender, |responder| Query::events_since(since, responder)).await?;
    Ok(web::Json(EventsDto { events, height }))
}

async fn handle_submit(
    calls: CallSender,
    body: web::Json<SubmitRequest>,
) -> actix_web::Result<HttpResponse> {
    let SubmitRequest {
        player,
        score,
        player_name,
        fid,
    } = body.into_inner();
    tracing::info!("received score {score} from {player}");
    let call = Call::submit(player, Submission::new(score, player_name, fid), now());
    apply(&calls, call).await
}

async fn handle_set_min_score(
    request: HttpRequest,
    token: web::Data<AdminToken>,
    calls: CallSender,
    body: web::Json<MinScoreRequest>,
) -> actix_web::Result<HttpResponse> {
    authorize(&request, &token)?;
    let MinScoreRequest {
        caller,
        min_score_to_submit,
    } = body.into_inner();
    let call = Call::set_min_score(caller, min_score_to_submit, now());
    apply(&calls, call).await
}

async fn handle_transfer_ownership(
    request: HttpRequest,
    token: web::Data<AdminToken>,
    calls: CallSender,
    body: web::Json<TransferOwnershipRequest>,
) -> actix_web::Result<HttpResponse> {
    authorize(&request, &token)?;
    let TransferOwnershipRequest { caller, new_owner } = body.into_inner();
    let call = Call::transfer_ownership(caller, new_owner, now());
    apply(&calls, call).await
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app::{
            call_source::{
                CallSource,
                ChannelCallSource,
            },
            query_api::{
                EventsQuery,
                PlayerQuery,
                TopScoresQuery,
            },
        },
        calls::CallKind,
    };
    use leaderboard::LeaderboardEvent;

    const ALICE: PlayerAddress = PlayerAddress::new([0x01; 20]);
    const OWNER: PlayerAddress = PlayerAddress::new([0xee; 20]);
    const TOKEN: &str = "letmein";

    async fn api_with_token(token: Option<&str>) -> (ActixQueryApi, ChannelCallSource) {
        let (calls, sender) = ChannelCallSource::new_with_sender();
        let api = ActixQueryApi::new(None, token.map(str::to_string), sender)
            .await
            .unwrap();
        (api, calls)
    }

    async fn api() -> (ActixQueryApi, ChannelCallSource) {
        api_with_token(Some(TOKEN)).await
    }

    fn entry(player: PlayerAddress, score: Score) -> ScoreEntry {
        ScoreEntry {
            player,
            score,
            timestamp: 1,
            player_name: "Alice".to_string(),
            fid: 9,
        }
    }

    #[tokio::test]
    async fn query__can_get_and_respond_to_leaderboard() {
        // given
        let (mut api, _calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/leaderboard", api.base_url());
        let expected_entries = vec![entry(ALICE, 120)];
        let expected_response = LeaderboardDto {
            entries: expected_entries.clone(),
            height: 42,
        };

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<LeaderboardDto>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::Leaderboard(sender) = query {
            sender.send((expected_entries, 42)).unwrap();
        } else {
            panic!("expected leaderboard query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert_eq!(response, expected_response);
    }

    #[tokio::test]
    async fn query__top_scores_forwards_requested_count() {
        // given
        let (mut api, _calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/leaderboard/top/5", api.base_url());

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<LeaderboardDto>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::TopScores(TopScoresQuery { count, sender }) = query {
            assert_eq!(count, 5);
            sender.send((Vec::new(), 3)).unwrap();
        } else {
            panic!("expected top scores query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert!(response.entries.is_empty());
        assert_eq!(response.height, 3);
    }

    #[tokio::test]
    async fn query__unknown_player__responds_not_found() {
        // given
        let (mut api, _calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/player/{ALICE}", api.base_url());

        let client_task = tokio::spawn(async move {
            client.get(url).send().await.unwrap().status()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::PlayerScore(PlayerQuery { player, sender }) = query {
            assert_eq!(player, ALICE);
            sender.send((None, 0)).unwrap();
        } else {
            panic!("expected player score query got {:?}", query);
        }

        // then
        let status = client_task.await.unwrap();
        assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn query__malformed_address__responds_bad_request() {
        // given
        let (api, _calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/player/0x1234/position", api.base_url());

        // when
        let response = client.get(url).send().await.unwrap();

        // then
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn query__events_since_uses_query_parameter() {
        // given
        let (mut api, _calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/events?since=7", api.base_url());
        let recorded = vec![RecordedEvent {
            height: 8,
            event: LeaderboardEvent::min_score_updated(10, 15),
        }];
        let expected = recorded.clone();

        let client_task = tokio::spawn(async move {
            let response = client.get(url).send().await.unwrap();
            response.json::<EventsDto>().await.unwrap()
        });

        // when
        let query = api.query().await.unwrap();
        if let Query::EventsSince(EventsQuery { since, sender }) = query {
            assert_eq!(since, 7);
            sender.send((recorded, 8)).unwrap();
        } else {
            panic!("expected events query got {:?}", query);
        }

        // then
        let response = client_task.await.unwrap();
        assert_eq!(response.events, expected);
        assert_eq!(response.height, 8);
    }

    #[tokio::test]
    async fn submit__forwards_call_and_returns_receipt() {
        // given
        let (api, mut calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/submit", api.base_url());
        let request = SubmitRequest {
            player: ALICE,
            score: 150,
            player_name: "Alice".to_string(),
            fid: 9,
        };
        let expected_receipt = CallReceipt::accepted(
            1,
            Some(1),
            vec![LeaderboardEvent::score_submitted(ALICE, 150, "Alice", 9)],
        );
        let reply = expected_receipt.clone();

        let client_task = tokio::spawn(async move {
            let response = client.post(url).json(&request).send().await.unwrap();
            let status = response.status();
            (status, response.json::<CallReceipt>().await.unwrap())
        });

        // when
        let pending = calls.next_call().await.unwrap();
        assert_eq!(pending.call.caller, ALICE);
        assert_eq!(
            pending.call.kind,
            CallKind::Submit(Submission::new(150, "Alice", 9))
        );
        pending.responder.unwrap().send(reply).unwrap();

        // then
        let (status, receipt) = client_task.await.unwrap();
        assert_eq!(status, reqwest::StatusCode::OK);
        assert_eq!(receipt, expected_receipt);
    }

    #[tokio::test]
    async fn admin_min_score__rejected_call__responds_unprocessable() {
        // given
        let (api, mut calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/admin/min-score", api.base_url());
        let request = MinScoreRequest {
            caller: ALICE,
            min_score_to_submit: 50,
        };

        let client_task = tokio::spawn(async move {
            let response = client
                .post(url)
                .bearer_auth(TOKEN)
                .json(&request)
                .send()
                .await
                .unwrap();
            let status = response.status();
            (status, response.json::<CallReceipt>().await.unwrap())
        });

        // when
        let pending = calls.next_call().await.unwrap();
        assert_eq!(pending.call.kind, CallKind::SetMinScore(50));
        let rejection = CallReceipt::rejected(0, format!("account {ALICE} is not authorized"));
        pending.responder.unwrap().send(rejection.clone()).unwrap();

        // then
        let (status, receipt) = client_task.await.unwrap();
        assert_eq!(status, reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(receipt, rejection);
    }

    #[tokio::test]
    async fn admin_owner__forwards_new_owner() {
        // given
        let (api, mut calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/admin/owner", api.base_url());
        let request = TransferOwnershipRequest {
            caller: OWNER,
            new_owner: ALICE,
        };

        let client_task = tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(TOKEN)
                .json(&request)
                .send()
                .await
                .unwrap()
                .status()
        });

        // when
        let pending = calls.next_call().await.unwrap();
        assert_eq!(pending.call.caller, OWNER);
        assert_eq!(pending.call.kind, CallKind::TransferOwnership(ALICE));
        let receipt = CallReceipt::accepted(
            1,
            None,
            vec![LeaderboardEvent::ownership_transferred(OWNER, ALICE)],
        );
        pending.responder.unwrap().send(receipt).unwrap();

        // then
        assert_eq!(client_task.await.unwrap(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_owner__missing_or_wrong_token__responds_unauthorized() {
        // given
        let (api, _calls) = api().await;
        let client = reqwest::Client::new();
        let url = format!("{}/admin/owner", api.base_url());
        let request = TransferOwnershipRequest {
            caller: OWNER,
            new_owner: ALICE,
        };

        // when
        let anonymous = client.post(&url).json(&request).send().await.unwrap();
        let guessed = client
            .post(&url)
            .bearer_auth("not-the-token")
            .json(&request)
            .send()
            .await
            .unwrap();

        // then
        assert_eq!(anonymous.status(), reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(guessed.status(), reqwest::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_min_score__no_token_configured__responds_forbidden() {
        // given
        let (api, _calls) = api_with_token(None).await;
        let client = reqwest::Client::new();
        let url = format!("{}/admin/min-score", api.base_url());
        let request = MinScoreRequest {
            caller: OWNER,
            min_score_to_submit: 50,
        };

        // when
        let response = client
            .post(url)
            .bearer_auth(TOKEN)
            .json(&request)
            .send()
            .await
            .unwrap();

        // then
        assert_eq!(response.status(), reqwest::StatusCode::FORBIDDEN);
    }
}
