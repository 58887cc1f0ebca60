use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use reqwest::{Method, StatusCode};
use serde_json::json;
use slash_http::{
    ApplicationCommand, ApplicationCommandOption, ApplicationCommandOptionType, DiscordHttpClient,
    EmbedFooter, Error, Interaction, InteractionResponse, MessageEmbed, RenderContext, WorkerPool,
};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

const APP: u64 = 775_799_577_604_522_054;
const GUILD: u64 = 290_926_798_626_357_999;

fn client(server: &MockServer) -> DiscordHttpClient {
    DiscordHttpClient::builder("secret", APP)
        .base_url(format!("{}/api/v8", server.uri()))
        .build()
        .unwrap()
}

fn commands_path() -> String {
    format!("/api/v8/applications/{}/commands", APP)
}

fn guild_commands_path() -> String {
    format!("/api/v8/applications/{}/guilds/{}/commands", APP, GUILD)
}

fn interaction() -> Interaction {
    serde_json::from_value(json!({
        "id": "786008729715212338",
        "application_id": APP.to_string(),
        "type": 2,
        "token": "A_UNIQUE_TOKEN",
        "guild_id": GUILD.to_string(),
        "channel_id": "645027906669510667",
        "data": { "id": "771825006014889984", "name": "stats" },
        "version": 1
    }))
    .unwrap()
}

#[tokio::test]
async fn submits_global_command_with_bot_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(commands_path()))
        .and(header("authorization", "Bot secret"))
        .and(body_json(json!({ "name": "ping", "description": "answers pong" })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "100",
            "application_id": APP.to_string(),
            "version": "1",
            "name": "ping",
            "description": "answers pong",
            "default_permission": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    let response = client
        .submit_global_command(&ApplicationCommand::new("ping", "answers pong"))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::CREATED);
    let created: ApplicationCommand = client.codec().decode_slice(&response.body).unwrap();
    assert_eq!(created.id, Some(100));
    assert!(created.same_definition(&ApplicationCommand::new("ping", "answers pong")));
}

#[tokio::test]
async fn already_registered_command_answers_ok() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(guild_commands_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "100",
            "name": "ping",
            "description": "answers pong"
        })))
        .mount(&server)
        .await;

    let response = client(&server)
        .submit_guild_command(&ApplicationCommand::new("ping", "answers pong"), GUILD)
        .unwrap()
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn interaction_reply_is_not_authorized_with_bot_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v8/interactions/786008729715212338/A_UNIQUE_TOKEN/callback"))
        .and(body_json(json!({ "type": 4, "data": { "content": "hi" } })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .submit_interaction_reply(&interaction(), &InteractionResponse::message("hi"))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_empty());
    let received = server.received_requests().await.unwrap();
    assert!(!received[0].headers.contains_key("authorization"));
}

#[tokio::test]
async fn reply_embeds_use_the_render_context() {
    struct Session;

    impl RenderContext for Session {
        fn default_color(&self) -> Option<u32> {
            Some(0xff8800)
        }

        fn default_footer(&self) -> Option<EmbedFooter> {
            Some(EmbedFooter::new("futaba"))
        }
    }

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "type": 4,
            "data": {
                "embeds": [{
                    "title": "Records",
                    "color": 0xff8800,
                    "footer": { "text": "futaba" },
                    "fields": [{ "name": "alice", "value": "12", "inline": true }]
                }]
            }
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = DiscordHttpClient::builder("secret", APP)
        .base_url(server.uri())
        .render_context(Session)
        .build()
        .unwrap();
    let embed = MessageEmbed::new().title("Records").field("alice", 12, true);

    client
        .submit_interaction_reply(&interaction(), &InteractionResponse::embed(embed))
        .unwrap()
        .await
        .unwrap();
}

#[tokio::test]
async fn unexpected_status_carries_request_and_response() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({ "message": "Unknown application command", "code": 10063 })),
        )
        .mount(&server)
        .await;

    let error = client(&server)
        .delete_global_command(42)
        .unwrap()
        .await
        .unwrap_err();

    assert_eq!(error.status(), Some(StatusCode::NOT_FOUND));
    let api = error.api_error().unwrap();
    assert!(api.is_not_found());
    assert_eq!(api.expected, vec![204]);
    assert_eq!(api.request.method, Method::DELETE);
    assert_eq!(api.request.url.path(), format!("{}/42", commands_path()));
    assert!(api.response.text().contains("Unknown application command"));
    assert!(!error.to_string().contains("secret"));
}

#[tokio::test]
async fn client_and_server_errors_are_classified() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(commands_path()))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "2"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(guild_commands_path()))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400))
        .mount(&server)
        .await;

    let client = client(&server);

    let limited = client.get_global_commands().unwrap().await.unwrap_err();
    let limited = limited.api_error().unwrap();
    assert!(limited.is_rate_limited());
    assert_eq!(limited.response.headers["retry-after"], "2");

    let broken = client.get_guild_commands(GUILD).unwrap().await.unwrap_err();
    assert_eq!(broken.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(broken.api_error().unwrap().response.text(), "oops");

    let rejected = client
        .submit_global_command(&ApplicationCommand::new("ping", "pong"))
        .unwrap()
        .await
        .unwrap_err();
    assert_eq!(rejected.status(), Some(StatusCode::BAD_REQUEST));
    assert!(!rejected.is_transport());
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    // nothing listens once the listener is dropped
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    let client = DiscordHttpClient::builder("secret", APP)
        .base_url(format!("http://{}", addr))
        .build()
        .unwrap();

    let error = client.get_global_command(1).unwrap().await.unwrap_err();

    assert!(error.is_transport());
    assert_eq!(error.status(), None);
}

#[tokio::test]
async fn transport_timeout_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;
    let client = DiscordHttpClient::builder("secret", APP)
        .base_url(server.uri())
        .http_client(
            reqwest::Client::builder()
                .timeout(Duration::from_millis(100))
                .build()
                .unwrap(),
        )
        .build()
        .unwrap();

    let error = client.get_global_commands().unwrap().await.unwrap_err();

    assert!(error.is_transport());
}

#[tokio::test]
async fn single_worker_sends_in_call_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "id": "1", "name": "a", "description": "a" }))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server);
    let created = client
        .submit_global_command(&ApplicationCommand::new("a", "a"))
        .unwrap();
    let listed = client.get_global_commands().unwrap();
    let (created, listed) = futures::join!(created, listed);

    created.unwrap();
    listed.unwrap();
    let methods: Vec<_> = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .map(|request| request.method.to_string())
        .collect();
    assert_eq!(methods, vec!["POST", "GET"]);
}

// DELETE on `command_path` makes later GETs of it answer 404
async fn mount_deletable_command(server: &MockServer, command_path: String) {
    let deleted = Arc::new(AtomicBool::new(false));

    let flag = deleted.clone();
    Mock::given(method("DELETE"))
        .and(path(command_path.clone()))
        .respond_with(move |_: &Request| {
            flag.store(true, Ordering::SeqCst);
            ResponseTemplate::new(204)
        })
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(command_path))
        .respond_with(move |_: &Request| {
            if deleted.load(Ordering::SeqCst) {
                ResponseTemplate::new(404)
            } else {
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": "55", "name": "a", "description": "a" }))
            }
        })
        .mount(server)
        .await;
}

#[tokio::test]
async fn global_get_after_delete_observes_the_delete() {
    let server = MockServer::start().await;
    mount_deletable_command(&server, format!("{}/55", commands_path())).await;

    let client = client(&server);
    let before = client.get_global_command(55).unwrap();
    let delete = client.delete_global_command(55).unwrap();
    let after = client.get_global_command(55).unwrap();

    assert_eq!(before.await.unwrap().status, StatusCode::OK);
    delete.await.unwrap();
    let error = after.await.unwrap_err();
    assert!(error.api_error().unwrap().is_not_found());
}

#[tokio::test]
async fn guild_get_after_delete_observes_the_delete() {
    let server = MockServer::start().await;
    mount_deletable_command(&server, format!("{}/55", guild_commands_path())).await;

    let client = client(&server);
    let delete = client.delete_guild_command(55, GUILD).unwrap();
    let get = client.get_guild_command(GUILD, 55).unwrap();

    delete.await.unwrap();
    let error = get.await.unwrap_err();
    assert!(error.api_error().unwrap().is_not_found());
}

#[tokio::test]
async fn pool_serves_concurrent_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "id": "1", "name": "a", "description": "a" }]))
                .set_delay(Duration::from_millis(50)),
        )
        .expect(100)
        .mount(&server)
        .await;

    let client = DiscordHttpClient::builder("secret", APP)
        .base_url(server.uri())
        .queue(WorkerPool::new(10).unwrap())
        .build()
        .unwrap();

    let started = Instant::now();
    let pending: Vec<_> = (0..100)
        .map(|_| client.get_global_commands().unwrap())
        .collect();
    let responses = futures::future::join_all(pending).await;

    // one at a time would take 5s
    assert!(started.elapsed() < Duration::from_secs(3));
    for response in responses {
        let commands: Vec<ApplicationCommand> =
            client.codec().decode_slice(&response.unwrap().body).unwrap();
        assert_eq!(commands.len(), 1);
    }
}

#[tokio::test]
async fn shutdown_drains_queue_and_refuses_new_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let first = client.get_global_commands().unwrap();
    let second = client.get_guild_commands(GUILD).unwrap();
    client.shutdown();
    client.shutdown();

    assert!(matches!(client.get_global_commands(), Err(Error::Shutdown)));
    assert!(first.await.is_ok());
    assert!(second.await.is_ok());
}

#[tokio::test]
async fn abort_cancels_pending_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client(&server);
    let first = client.get_global_commands().unwrap();
    let second = client.get_global_commands().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    client.abort();

    let (first, second) = tokio::time::timeout(Duration::from_secs(1), async {
        futures::join!(first, second)
    })
    .await
    .unwrap();
    assert!(matches!(first, Err(Error::Cancelled)));
    assert!(matches!(second, Err(Error::Cancelled)));
}

#[tokio::test]
async fn invalid_payloads_never_reach_the_network() {
    let server = MockServer::start().await;
    let client = client(&server);

    let command = ApplicationCommand::new("bad", "bad").option(
        ApplicationCommandOption::new(ApplicationCommandOptionType::Boolean, "flag", "flag")
            .choice("yes", "yes"),
    );
    assert!(matches!(
        client.submit_guild_command(&command, GUILD),
        Err(Error::Encode(_))
    ));

    let mut empty = InteractionResponse::message("x");
    empty.data = None;
    assert!(matches!(
        client.submit_interaction_reply(&interaction(), &empty),
        Err(Error::Encode(_))
    ));

    assert!(server.received_requests().await.unwrap().is_empty());
}
