use std::collections::BTreeMap;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};

use crate::api::ApiClient;
use crate::controller::{Command, MapEvent};
use crate::error::Result;
use crate::species::{SpeciesCommand, SpeciesMatch};

/// Wyniki zadań sieciowych wracające do pętli interfejsu
#[derive(Debug)]
pub enum AppMessage {
    Map(MapEvent),
    SearchLoaded { seq: u64, result: Result<Vec<SpeciesMatch>> },
    JurisdictionsLoaded { seq: u64, result: Result<BTreeMap<String, Vec<String>>> },
}

/// Wykonuje polecenia na zadaniach tokio; stan zmienia tylko pętla UI
pub struct Fetcher {
    api: ApiClient,
    runtime: Handle,
    tx: UnboundedSender<AppMessage>,
}

impl Fetcher {
    pub fn new(api: ApiClient, runtime: Handle) -> (Self, UnboundedReceiver<AppMessage>) {
        let (tx, rx) = unbounded_channel();
        (Self { api, runtime, tx }, rx)
    }

    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = AppMessage> + Send + 'static,
    {
        let tx = self.tx.clone();
        self.runtime.spawn(async move {
            // odbiorca znika tylko przy zamykaniu aplikacji
            let _ = tx.send(task.await);
        });
    }

    pub fn run(&self, command: Command) {
        let api = self.api.clone();
        match command {
            Command::FetchCounts { seq, filters } => {
                tracing::debug!(seq, filters = %filters.to_query_string(), "Fetching counts");
                self.spawn(async move {
                    let result = api.region_counts(&filters).await;
                    AppMessage::Map(MapEvent::CountsLoaded { seq, result })
                });
            }
            Command::FetchGeography => {
                self.spawn(async move {
                    let result = api.geography().await;
                    AppMessage::Map(MapEvent::GeographyLoaded { result })
                });
            }
            Command::FetchDetail { seq, identity, filters } => {
                tracing::debug!(seq, region = %identity, "Fetching region details");
                self.spawn(async move {
                    let result = api.region_detail(&identity, &filters).await;
                    AppMessage::Map(MapEvent::DetailLoaded { seq, identity, result })
                });
            }
        }
    }

    pub fn run_all(&self, commands: Vec<Command>) {
        for command in commands {
            self.run(command);
        }
    }

    pub fn run_species(&self, command: SpeciesCommand) {
        let api = self.api.clone();
        match command {
            SpeciesCommand::Search { seq, term } => self.spawn(async move {
                let result = api.search_species(&term).await;
                AppMessage::SearchLoaded { seq, result }
            }),
            SpeciesCommand::Jurisdictions { seq, usage_key } => self.spawn(async move {
                let result = api.species_jurisdictions(usage_key).await;
                AppMessage::JurisdictionsLoaded { seq, result }
            }),
        }
    }
}
