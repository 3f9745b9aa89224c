use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use sl_fetcher::{
    BearerAuth, Client, ClientConfig, FormData, HeaderInterceptor, Method, Payload,
    RequestOptions, ResponseBody, ResponseType, TracingInterceptor,
};

use crate::output::{print_body, print_fetcher_error};

/// Connection settings shared by every subcommand.
#[derive(Args)]
pub struct ClientArgs {
    /// Base URL joined with every request path
    #[arg(long, env = "SL_FETCHER_BASE_URL", global = true)]
    pub base_url: Option<String>,

    /// Extra request header as `Name: value` (repeatable)
    #[arg(short = 'H', long = "header", global = true)]
    pub headers: Vec<String>,

    /// Bearer token sent in the Authorization header
    #[arg(long, global = true)]
    pub bearer: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct PathArgs {
    /// Request path, relative to the base URL
    pub path: String,
}

#[derive(Args)]
pub struct BodyArgs {
    /// Request path, relative to the base URL
    pub path: String,

    /// JSON body (defaults to `{}`)
    #[arg(long, conflicts_with = "form")]
    pub data: Option<String>,

    /// Multipart field as `name=value`, or `name=@file` to attach a file (repeatable)
    #[arg(long)]
    pub form: Vec<String>,
}

impl BodyArgs {
    pub fn payload(&self) -> Result<Payload> {
        if !self.form.is_empty() {
            return Ok(Payload::Form(parse_form(&self.form)?));
        }
        let value = match &self.data {
            Some(raw) => serde_json::from_str(raw).context("--data is not valid JSON")?,
            None => serde_json::json!({}),
        };
        Ok(Payload::Json(value))
    }
}

/// Builds the client and registers the interceptors the flags ask for.
pub fn build_client(args: &ClientArgs, verbose: bool) -> Result<Client> {
    let mut config = ClientConfig::builder();
    if let Some(base_url) = &args.base_url {
        config = config.base_url(base_url);
    }
    if let Some(secs) = args.timeout {
        config = config.timeout(Duration::from_secs(secs));
    }
    let mut client = Client::new(config.build())?;

    if !args.headers.is_empty() {
        let pairs = args
            .headers
            .iter()
            .map(|raw| parse_header(raw))
            .collect::<Result<Vec<_>>>()?;
        client.add_request_interceptor(HeaderInterceptor::from_pairs(pairs)?);
    }
    if let Some(token) = &args.bearer {
        client.add_request_interceptor(BearerAuth::new(token)?);
    }
    if verbose {
        client.add_response_interceptor(TracingInterceptor::new().with_headers());
    }
    Ok(client)
}

/// Splits `Name: value` into its parts.
pub fn parse_header(raw: &str) -> Result<(&str, &str)> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| anyhow!("header {:?} is not in `Name: value` form", raw))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("header {:?} has an empty name", raw);
    }
    Ok((name, value.trim()))
}

/// Parses `name=value` / `name=@path` fields into a form.
pub fn parse_form(fields: &[String]) -> Result<FormData> {
    let mut form = FormData::new();
    for field in fields {
        let (name, value) = field
            .split_once('=')
            .ok_or_else(|| anyhow!("form field {:?} is not in `name=value` form", field))?;
        form = match value.strip_prefix('@') {
            Some(path) => {
                let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;
                let file_name = std::path::Path::new(path)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned());
                form.file(name, bytes, file_name, None)
            }
            None => form.text(name, value),
        };
    }
    Ok(form)
}

/// Sends the request and prints the decoded body, or the failure details.
pub async fn run(
    client: &Client,
    method: Method,
    path: &str,
    payload: Option<Payload>,
    response_type: ResponseType,
) -> Result<()> {
    let body = execute(client, method, path, payload, response_type).await?;
    print_body(body.as_ref())?;
    Ok(())
}

async fn execute(
    client: &Client,
    method: Method,
    path: &str,
    payload: Option<Payload>,
    response_type: ResponseType,
) -> Result<Option<ResponseBody>> {
    tracing::debug!(%method, path, %response_type, "Dispatching request");
    let options = RequestOptions::new().response_type(response_type);
    match client.request(path, method, payload, Some(options)).await {
        Ok(body) => Ok(body),
        Err(e) => {
            if let Some(failure) = e.as_fetcher_error() {
                print_fetcher_error(failure);
            }
            Err(e.into())
        }
    }
}
