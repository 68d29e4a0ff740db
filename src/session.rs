use tokio::sync::Mutex;

use crate::ajax::{AjaxClient, RequestOptions};
use crate::data_models::{FormError, SearchForm, SearchResponse};
use crate::location::{AddressMode, PageLocation};
use crate::render::ResultArea;
use crate::view::{Outcome, SearchView, ViewState};

/// Drives a [`SearchView`] against the page's `results` endpoint. The view
/// lock is held only to submit and to apply a response, so overlapping
/// searches run concurrently and are ordered by generation.
pub struct SearchSession {
    client: AjaxClient,
    view: Mutex<SearchView>,
}

impl SearchSession {
    pub fn new(client: AjaxClient, location: PageLocation, address_mode: AddressMode) -> Self {
        Self {
            client,
            view: Mutex::new(SearchView::new(location, address_mode)),
        }
    }

    pub async fn search(&self, form: &SearchForm) -> Result<Outcome, FormError> {
        let pending = self.view.lock().await.submit(form)?;

        let result = self
            .client
            .fetch_json::<SearchResponse>(&pending.request_url, RequestOptions::default())
            .await;

        let outcome = self.view.lock().await.receive(pending.generation, result);
        if outcome == Outcome::Stale {
            log::info!("search #{} superseded before it finished", pending.generation);
        }
        Ok(outcome)
    }

    pub async fn state(&self) -> ViewState {
        self.view.lock().await.state()
    }

    pub async fn area(&self) -> ResultArea {
        self.view.lock().await.area().clone()
    }

    pub async fn address(&self) -> Option<String> {
        self.view.lock().await.history().current().map(str::to_string)
    }

    pub async fn to_html(&self) -> String {
        self.view.lock().await.to_html()
    }
}
