use crate::ajax::AjaxError;
use crate::data_models::{FormError, SearchForm, SearchRequest, SearchResponse};
use crate::location::{AddressMode, History, PageLocation};
use crate::render::ResultArea;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    Loading,
    ShowingResults,
    ShowingEmpty,
    Error,
}

#[derive(Debug)]
enum Transition {
    Submit,
    Respond(SearchResponse),
    Fail(String),
}

/// What became of a response handed to [`SearchView::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied(ViewState),
    /// A newer submission was made after this one; nothing changed.
    Stale,
}

/// Everything the caller needs to issue the request for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSearch {
    pub generation: u64,
    pub request: SearchRequest,
    pub request_url: String,
    pub display_url: String,
}

/// Result area of the search page as a finite-state view. Every visible
/// change goes through [`SearchView::dispatch`].
#[derive(Debug, Clone)]
pub struct SearchView {
    location: PageLocation,
    address_mode: AddressMode,
    history: History,
    state: ViewState,
    area: ResultArea,
    generation: u64,
}

impl SearchView {
    pub fn new(location: PageLocation, address_mode: AddressMode) -> SearchView {
        let history = History::new(location.page_url());
        SearchView {
            location,
            address_mode,
            history,
            state: ViewState::Idle,
            area: ResultArea::default(),
            generation: 0,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn area(&self) -> &ResultArea {
        &self.area
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Form submission. Any response to an earlier submission is stale from
    /// here on, even when the form turns out to be invalid.
    pub fn submit(&mut self, form: &SearchForm) -> Result<PendingSearch, FormError> {
        self.generation += 1;

        let request = match SearchRequest::from_form(form) {
            Ok(request) => request,
            Err(e) => {
                self.dispatch(Transition::Fail(e.to_string()));
                return Err(e);
            }
        };

        let request_url = self.location.results_url(&request);
        let display_url = self.location.display_url(&request, self.address_mode);
        self.history.push_state(display_url.clone());
        self.dispatch(Transition::Submit);

        log::info!(
            "search #{} submitted: level={} url={request_url}",
            self.generation,
            request.level
        );

        Ok(PendingSearch {
            generation: self.generation,
            request,
            request_url,
            display_url,
        })
    }

    pub fn receive(
        &mut self,
        generation: u64,
        result: Result<SearchResponse, AjaxError>,
    ) -> Outcome {
        if generation != self.generation || self.state != ViewState::Loading {
            log::debug!(
                "dropping response for search #{generation}, current is #{}",
                self.generation
            );
            return Outcome::Stale;
        }

        match result {
            Ok(res) => self.dispatch(Transition::Respond(res)),
            Err(e) => {
                log::error!("search #{generation} failed: {:#}", e);
                self.dispatch(Transition::Fail(e.to_string()));
            }
        }
        Outcome::Applied(self.state)
    }

    fn dispatch(&mut self, transition: Transition) {
        self.state = match transition {
            Transition::Submit => {
                self.area.begin_loading();
                ViewState::Loading
            }
            Transition::Respond(res) => {
                if self.area.show_response(&res) {
                    ViewState::ShowingResults
                } else {
                    ViewState::ShowingEmpty
                }
            }
            Transition::Fail(message) => {
                self.area.show_error(message);
                ViewState::Error
            }
        };
    }

    pub fn to_html(&self) -> String {
        self.area.to_html()
    }
}
