use anyhow::Result;
use relay::agent::Agent;
use relay::invoker::ToolInvoker;
use relay::providers::openai::OpenAiProvider;
use relay::transport::connect;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::configuration::Settings;

/// Shared application state: the process-wide tool session, once it is open
#[derive(Clone, Default)]
pub struct AppState {
    agent: Arc<RwLock<Option<Arc<Agent>>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn install(&self, agent: Agent) {
        *self.agent.write().await = Some(Arc::new(agent));
    }

    /// The open session, or None when startup could not reach the tool server
    pub async fn agent(&self) -> Option<Arc<Agent>> {
        self.agent.read().await.clone()
    }

    /// Close the tool session; requests made afterwards see an uninitialised server
    pub async fn close(&self) {
        let agent = self.agent.write().await.take();
        if let Some(agent) = agent {
            agent.shutdown().await;
            info!("tool session closed");
        }
    }
}

/// Connect to the configured tool server and model backend
pub async fn open_session(settings: &Settings) -> Result<Agent> {
    let provider = OpenAiProvider::new(settings.provider.to_config())?;
    info!("using model {} at {}", provider.model(), settings.provider.host);

    let transport = connect(&settings.tools.server, settings.tools.timeout()).await?;
    let invoker = ToolInvoker::new(Arc::from(transport), settings.tools.timeout());

    Ok(Agent::with_config(
        Box::new(provider),
        invoker,
        settings.agent_config(),
    ))
}
