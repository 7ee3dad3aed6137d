use ingestion_application::fetcher::CandleFetcherImplParameters;
use ingestion_application::{
    CandleFetcherImpl, CandleStoreImpl, IngestionServiceImpl, InstrumentCatalogImpl,
    ThrottlePolicy,
};
use ingestion_infrastructure::gateways::tinkoff::TinkoffRestProviderParameters;
use ingestion_infrastructure::repositories::postgres::PostgresCandleRepositoryParameters;
use ingestion_infrastructure::{
    PostgresCandleRepository, Settings, SystemClock, TinkoffRestProvider,
};
use shaku::module;

module! {
    pub AppModule {
        components = [
            TinkoffRestProvider,
            PostgresCandleRepository,
            SystemClock,
            InstrumentCatalogImpl,
            CandleFetcherImpl,
            CandleStoreImpl,
            IngestionServiceImpl
        ],
        providers = []
    }
}

pub fn create_app_module(settings: &Settings) -> AppModule {
    AppModule::builder()
        .with_component_parameters::<TinkoffRestProvider>(TinkoffRestProviderParameters {
            api: settings.api.clone(),
            ..Default::default()
        })
        .with_component_parameters::<PostgresCandleRepository>(
            PostgresCandleRepositoryParameters {
                database: settings.database.clone(),
                ..Default::default()
            },
        )
        .with_component_parameters::<CandleFetcherImpl>(CandleFetcherImplParameters {
            policy: ThrottlePolicy::default(),
        })
        .build()
}
