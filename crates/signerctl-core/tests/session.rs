//! End-to-end sessions against a stub engine over a real Unix socket.

use pretty_assertions::assert_eq;
use signerctl_core::{
    ClientError, Command, EngineTarget, Established, ProtocolDriver, establish, spawn_input,
};
use signerctl_test_utils::{Behavior, LogCapture, StubEngine, TestConfigBuilder};

fn command(text: &str) -> Command {
    Command::from_words(text.split(' ')).unwrap().unwrap()
}

fn target_for(engine: &StubEngine) -> EngineTarget {
    let config = TestConfigBuilder::new()
        .socket_path(engine.socket_path())
        .engine_binary("true")
        .build();
    EngineTarget::from_config(&config, "/etc/opendnssec/signerctl.toml")
}

async fn connect(target: &EngineTarget, cmd: Option<&Command>) -> tokio::net::UnixStream {
    match establish(target, cmd).await.unwrap() {
        Established::Connected(stream) => stream,
        Established::Spawned(status) => panic!("unexpected engine spawn: {status}"),
    }
}

#[test_log::test(tokio::test)]
async fn test_batch_echo_prints_response_without_sentinel() {
    let engine = StubEngine::spawn(Behavior::EchoWithSentinel);
    let target = target_for(&engine);
    let cmd = command("sign example.com");

    let stream = connect(&target, Some(&cmd)).await;
    let mut output = Vec::new();
    ProtocolDriver::batch(stream, &mut output, cmd.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(output, b"sign example.com\n");
    // the command went out exactly once and nothing followed it
    assert_eq!(engine.received().await, cmd.as_bytes());
}

#[tokio::test]
async fn test_batch_short_response_fails() {
    let engine = StubEngine::spawn(Behavior::Reply(b"ok\n".to_vec()));
    let target = target_for(&engine);
    let cmd = command("queue");

    let stream = connect(&target, Some(&cmd)).await;
    let mut output = Vec::new();
    let err = ProtocolDriver::batch(stream, &mut output, cmd)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::ShortResponse { received: 3 }));
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn test_batch_stop_response_is_normal_exit() {
    let engine = StubEngine::spawn(Behavior::Reply(b"Engine shut down.".to_vec()));
    let target = target_for(&engine);
    let cmd = command("stop");

    let stream = connect(&target, Some(&cmd)).await;
    let mut output = Vec::new();
    ProtocolDriver::batch(stream, &mut output, cmd)
        .run()
        .await
        .unwrap();

    assert_eq!(output, b"Engine shut down.\n");
}

#[tokio::test]
async fn test_interactive_hangup_is_premature() {
    let engine = StubEngine::spawn(Behavior::Hangup);
    let target = target_for(&engine);

    let stream = connect(&target, None).await;
    // an input source that never ends
    let (_input_tx, input_rx) = tokio::sync::mpsc::channel(1);
    let mut output = Vec::new();
    let err = ProtocolDriver::interactive(stream, &mut output, input_rx)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::PrematureClose));
    assert!(output.is_empty());
}

#[tokio::test]
async fn test_interactive_relay_until_input_ends() {
    let engine = StubEngine::spawn(Behavior::CollectThenReply(b"Zones: 2".to_vec()));
    let target = target_for(&engine);

    let stream = connect(&target, None).await;
    let input = spawn_input(std::io::Cursor::new(b"zones   \n".to_vec()));
    let mut output = Vec::new();
    ProtocolDriver::interactive(stream, &mut output, input)
        .run()
        .await
        .unwrap();

    assert_eq!(output, b"Zones: 2");
    assert_eq!(engine.received().await, b"zones");
}

#[tokio::test]
async fn test_interactive_quit_sends_nothing() {
    let engine = StubEngine::spawn(Behavior::CollectThenReply(Vec::new()));
    let target = target_for(&engine);

    let stream = connect(&target, None).await;
    let input = spawn_input(std::io::Cursor::new(b"quit\nzones\n".to_vec()));
    let mut output = Vec::new();
    ProtocolDriver::interactive(stream, &mut output, input)
        .run()
        .await
        .unwrap();

    assert!(output.is_empty());
    assert!(engine.received().await.is_empty());
}

#[tokio::test]
async fn test_establish_logs_client_role() {
    let capture = LogCapture::new();
    let _guard = capture.set_default();

    let engine = StubEngine::spawn(Behavior::Hangup);
    let target = target_for(&engine);
    let _stream = connect(&target, None).await;

    assert!(capture.contains_field("role", "client"));
}

#[tokio::test]
async fn test_running_against_dead_socket() {
    let dir = tempfile::TempDir::new().unwrap();
    let target = EngineTarget::new(
        dir.path().join("engine.sock"),
        "/nonexistent/ods-signerd",
        dir.path().join("signerctl.toml"),
    );

    let err = establish(&target, Some(&command("running")))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Engine not running.");
    assert_eq!(err.exit_code(), 1);
}
