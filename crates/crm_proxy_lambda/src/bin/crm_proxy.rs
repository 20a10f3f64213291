use crm_proxy_core::CrmError;
use crm_proxy_lambda::adapters::signature::BinarySignatureTimestamp;
use crm_proxy_lambda::adapters::transport::SoapTransport;
use crm_proxy_lambda::config::CrmConfig;
use crm_proxy_lambda::handlers::dispatch::{handle_invocation, DispatchSettings, Dispatcher};
use crm_proxy_lambda::soap::SoapClient;
use lambda_runtime::{service_fn, tracing, Error, LambdaEvent};
use reqwest::StatusCode;
use serde_json::Value;

struct HttpSoapTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSoapTransport {
    fn from_config(config: &CrmConfig, certificate: &[u8]) -> Result<Self, CrmError> {
        let key = std::fs::read(&config.tls.key_file).map_err(|error| {
            CrmError::Config(format!(
                "failed to read {}: {error}",
                config.tls.key_file.display()
            ))
        })?;
        let mut identity_pem = certificate.to_vec();
        identity_pem.push(b'\n');
        identity_pem.extend_from_slice(&key);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|error| CrmError::Config(format!("invalid client identity: {error}")))?;

        let client = reqwest::Client::builder()
            .identity(identity)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(!config.tls.verify_server)
            .build()
            .map_err(|error| CrmError::Config(format!("failed to build HTTP client: {error}")))?;

        Ok(Self {
            client,
            endpoint: config.descriptor.endpoint.clone(),
        })
    }
}

impl SoapTransport for HttpSoapTransport {
    fn post_envelope(&self, soap_action: &str, envelope: &str) -> Result<String, String> {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let soap_action = format!("\"{soap_action}\"");
        let body = envelope.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .post(endpoint)
                    .header("Content-Type", "text/xml; charset=utf-8")
                    .header("SOAPAction", soap_action)
                    .body(body)
                    .send()
                    .await
                    .map_err(|error| format!("failed to reach CRM endpoint: {error}"))?;

                // Faults travel as HTTP 500 with a SOAP body.
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .map_err(|error| format!("failed to read CRM response: {error}"))?;
                if status.is_success() || status == StatusCode::INTERNAL_SERVER_ERROR {
                    Ok(text)
                } else {
                    Err(format!("CRM endpoint responded with HTTP {status}"))
                }
            })
        })
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<Value, Error> {
    let config = CrmConfig::from_env()?;
    let certificate = std::fs::read(&config.tls.cert_file).map_err(|error| {
        Error::from(format!(
            "failed to read {}: {error}",
            config.tls.cert_file.display()
        ))
    })?;

    let signer = BinarySignatureTimestamp::from_pem(&String::from_utf8_lossy(&certificate))?;
    let transport = HttpSoapTransport::from_config(&config, &certificate)?;
    let client = SoapClient::new(&transport, &signer, &config.descriptor);
    let dispatcher = Dispatcher::new(client, DispatchSettings::from_config(&config));

    Ok(handle_invocation(event.payload, &dispatcher)?)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();
    lambda_runtime::run(service_fn(handle_request)).await
}
