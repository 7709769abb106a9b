//! 설정에 따른 Provider 구성.

use std::sync::Arc;

use radar_data::{
    AlphaVantageClient, CompositeProvider, FixtureProvider, MarketDataProvider, YahooProvider,
};
use tracing::info;

use crate::config::{CollectorConfig, ProviderKind};
use crate::error::CollectorError;
use crate::Result;

fn alpha_vantage(config: &CollectorConfig) -> Result<AlphaVantageClient> {
    let client = AlphaVantageClient::with_timeout(config.api_key()?, config.provider.http_timeout())?;
    Ok(match &config.provider.alpha_vantage_base_url {
        Some(url) => client.with_base_url(url.clone()),
        None => client,
    })
}

/// 설정된 종류의 Provider 생성.
pub fn build_provider(config: &CollectorConfig) -> Result<Arc<dyn MarketDataProvider>> {
    let provider: Arc<dyn MarketDataProvider> = match config.provider.kind {
        ProviderKind::AlphaVantage => Arc::new(alpha_vantage(config)?),
        ProviderKind::Yahoo => Arc::new(YahooProvider::new()?),
        ProviderKind::Composite => Arc::new(
            CompositeProvider::new(vec![
                Box::new(alpha_vantage(config)?),
                Box::new(YahooProvider::new()?),
            ])
            .with_call_timeout(config.pipeline.call_timeout()),
        ),
        ProviderKind::Fixture => {
            let path = config.provider.fixture_path.as_ref().ok_or_else(|| {
                CollectorError::Config("provider.fixture_path가 없습니다".to_string())
            })?;
            Arc::new(FixtureProvider::from_file(path)?)
        }
    };

    info!(provider = provider.name(), kind = ?config.provider.kind, "Provider 구성 완료");
    Ok(provider)
}
