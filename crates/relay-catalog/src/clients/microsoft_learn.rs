use super::client_accessors;
use relay_mcp::McpClient;
use tracing::info;

pub const MICROSOFT_LEARN_URL: &str = "https://learn.microsoft.com/api/mcp";

const DEFAULT_REQUIRED: [&str; 2] = ["query", "question"];

/// Client for the Microsoft Learn docs search server
pub struct MicrosoftLearn {
    client: McpClient,
}

client_accessors!(MicrosoftLearn);

impl MicrosoftLearn {
    pub const NAME: &'static str = "MicrosoftDocsSearch";
    pub const VERSION: &'static str = "1.8.9";

    #[must_use]
    pub fn new() -> Self {
        Self {
            client: McpClient::new(Self::NAME, Self::VERSION),
        }
    }

    /// Connect to Microsoft Learn; failures go to the event callback
    ///
    /// Returns whether the client is connected afterwards.
    pub async fn open(&mut self) -> bool {
        if let Err(e) = self.client.open_connection_http(MICROSOFT_LEARN_URL, None).await {
            self.client.events().error("open", "open Microsoft Learn", e);
            return false;
        }

        fill_required(&mut self.client);
        info!("Microsoft Learn connected with {} tools", self.client.tools().len());
        true
    }
}

/// Tools that declare no required parameters get `query` and `question`
fn fill_required(client: &mut McpClient) {
    for tool in client.tools_mut() {
        let parameters = tool.ensure_parameters();
        if parameters.required.is_none() {
            parameters.required = Some(DEFAULT_REQUIRED.iter().map(ToString::to_string).collect());
        }
    }
}
