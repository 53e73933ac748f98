use super::js;
use crate::near::RpcTransport;
use anyhow::{anyhow, Result};
use serde_json::Value;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Headers, Request, RequestInit, Response};

/// JSON-RPC transport over the browser's `fetch()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchTransport;

#[async_trait::async_trait(?Send)]
impl RpcTransport for FetchTransport {
    async fn post_json(&self, url: &str, body: &Value) -> Result<Value> {
        let window = web_sys::window().ok_or_else(|| anyhow!("no window"))?;

        let headers = Headers::new().map_err(|e| anyhow!("headers: {}", js::describe(&e)))?;
        headers
            .set("Content-Type", "application/json")
            .map_err(|e| anyhow!("headers: {}", js::describe(&e)))?;

        let init = RequestInit::new();
        init.set_method("POST");
        init.set_headers(&headers);
        init.set_body(&wasm_bindgen::JsValue::from_str(&serde_json::to_string(body)?));

        let request = Request::new_with_str_and_init(url, &init)
            .map_err(|e| anyhow!("request: {}", js::describe(&e)))?;
        let response: Response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(|e| anyhow!("fetch {url}: {}", js::describe(&e)))?
            .dyn_into()
            .map_err(|_| anyhow!("fetch {url}: not a Response"))?;
        if !response.ok() {
            return Err(anyhow!("fetch {url}: HTTP {}", response.status()));
        }

        let text = response.text().map_err(|e| anyhow!("body: {}", js::describe(&e)))?;
        let text = JsFuture::from(text)
            .await
            .map_err(|e| anyhow!("body: {}", js::describe(&e)))?
            .as_string()
            .ok_or_else(|| anyhow!("body is not text"))?;
        Ok(serde_json::from_str(&text)?)
    }
}
