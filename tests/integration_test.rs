use std::sync::Arc;
use std::time::Duration;

use chat_gateway::registry::{chat_service, initialize_llm_provider, llm_provider};
use chat_gateway::{
    ChatCompletionRequest, ChatService, Error, FinishReason, LLMProvider, Message, MockProvider,
    ProviderConfig, ProviderFactory, ProviderRegistry, ProviderType, Role, Settings,
};
use futures_util::StreamExt;
use tokio_test::{assert_err, assert_ok};

fn service() -> ChatService {
    ChatService::new(Arc::new(MockProvider::new().with_stream_delay(Duration::ZERO)))
}

fn hello() -> ChatCompletionRequest {
    ChatCompletionRequest::new("mock", vec![Message::user("Hello").unwrap()])
}

#[tokio::test]
async fn test_hello_completion() {
    let response = assert_ok!(service().complete(&hello()).await);

    assert!(response.id.starts_with("chatcmpl-"));
    assert_eq!(response.object, "chat.completion");
    assert_eq!(response.model, "mock");
    assert_eq!(response.choices[0].message.role(), Role::Assistant);
    assert!(response.choices[0].message.content().contains("Hello"));
    assert_eq!(response.choices[0].finish_reason, FinishReason::Stop);
}

#[tokio::test]
async fn test_hello_streaming_completion() {
    let request = hello().with_stream(true);
    let chunks: Vec<_> = service()
        .complete_stream(&request)
        .await
        .unwrap()
        .map(|chunk| chunk.unwrap())
        .collect()
        .await;

    let (terminal, body) = chunks.split_last().unwrap();
    assert!(body.iter().all(|c| c.id == terminal.id));
    assert!(body.iter().all(|c| c.choices[0].finish_reason.is_none()));
    assert_eq!(terminal.choices[0].finish_reason, Some(FinishReason::Stop));

    let streamed: String = body
        .iter()
        .filter_map(|c| c.choices[0].delta.content.as_deref())
        .collect();
    let complete = service().complete(&hello()).await.unwrap();
    assert_eq!(streamed, complete.choices[0].message.content());
}

#[tokio::test]
async fn test_empty_messages_rejected() {
    let request = ChatCompletionRequest::new("mock", vec![]);
    let err = assert_err!(service().complete(&request).await);
    assert!(matches!(err, Error::InvalidInput(_)));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_factory_resolves_names_and_models() {
    let provider = ProviderFactory::resolve("mock").await.unwrap();
    assert_eq!(provider.name(), "mock");

    assert_eq!(ProviderType::from_model("mock").unwrap(), ProviderType::Mock);
    assert!(matches!(
        ProviderFactory::resolve("llama").await,
        Err(Error::UnknownProvider { .. })
    ));
}

#[tokio::test]
async fn test_registry_from_mock_settings() {
    let settings = Settings {
        llm_provider: "mock".to_string(),
        mock_stream_delay: Duration::ZERO,
        ..Settings::default()
    };
    let config = assert_ok!(ProviderConfig::from_settings(&settings));

    let registry = ProviderRegistry::new();
    assert!(matches!(registry.current(), Err(Error::NotInitialized)));

    let provider: Arc<dyn LLMProvider> = registry.initialize(&config).await.unwrap();
    let service = ChatService::new(provider);
    let response = assert_ok!(service.complete(&hello()).await);
    assert!(!response.choices[0].message.content().is_empty());
}

// The only test in this binary that touches the process-wide registry.
#[tokio::test]
async fn test_startup_hook_lifecycle() {
    assert!(matches!(llm_provider(), Err(Error::NotInitialized)));
    assert!(matches!(chat_service(), Err(Error::NotInitialized)));

    let unknown = Settings {
        llm_provider: "llama".to_string(),
        ..Settings::default()
    };
    assert!(matches!(
        initialize_llm_provider(&unknown).await,
        Err(Error::UnknownProvider { name }) if name == "llama"
    ));
    assert!(matches!(llm_provider(), Err(Error::NotInitialized)));

    let settings = Settings {
        llm_provider: "mock".to_string(),
        mock_stream_delay: Duration::ZERO,
        ..Settings::default()
    };
    let provider = assert_ok!(initialize_llm_provider(&settings).await);
    assert_eq!(provider.name(), "mock");
    assert!(Arc::ptr_eq(&provider, &llm_provider().unwrap()));
    assert!(Arc::ptr_eq(&llm_provider().unwrap(), &llm_provider().unwrap()));

    // Later calls keep the first provider.
    let again = assert_ok!(initialize_llm_provider(&Settings::default()).await);
    assert!(Arc::ptr_eq(&provider, &again));

    let service = assert_ok!(chat_service());
    assert!(Arc::ptr_eq(service.provider(), &provider));
    let response = assert_ok!(service.complete(&hello()).await);
    assert_eq!(response.choices[0].finish_reason, FinishReason::Stop);
}
