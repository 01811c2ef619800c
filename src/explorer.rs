//! Latest-block lookups for timestamp tokens
//!
//! A genesis timestamp may contain `{BTC}`, `{ETH}` or `{ZEC}`; each is
//! replaced by the current height and hash of that chain, as reported by a
//! public block explorer.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, instrument};

/// Chains whose latest block can be looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coin {
    Btc,
    Eth,
    Zec,
}

impl Coin {
    pub fn ticker(&self) -> &'static str {
        match self {
            Coin::Btc => "BTC",
            Coin::Eth => "ETH",
            Coin::Zec => "ZEC",
        }
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.ticker())
    }
}

impl FromStr for Coin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BTC" => Ok(Coin::Btc),
            "ETH" => Ok(Coin::Eth),
            "ZEC" => Ok(Coin::Zec),
            other => Err(Error::explorer(format!("coin {} not supported", other))),
        }
    }
}

/// Height and hash of a chain tip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestBlock {
    pub height: u64,
    /// Hex hash without `0x` prefix
    pub hash: String,
}

impl LatestBlock {
    fn new(height: u64, hash: &str) -> Self {
        Self {
            height,
            hash: hash.strip_prefix("0x").unwrap_or(hash).to_string(),
        }
    }

    /// Text substituted for the coin's token, e.g. `BTC#436254 0000...487d`
    pub fn token_text(&self, coin: Coin) -> String {
        format!("{}#{} {}", coin, self.height, self.hash)
    }
}

/// Anything that can report the latest block of a chain
#[async_trait]
pub trait LatestBlockSource: Send + Sync {
    async fn latest_block(&self, coin: Coin) -> Result<LatestBlock>;
}

/// Explorer API base URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplorerEndpoints {
    pub btc: String,
    pub eth: String,
    pub zec: String,
}

impl Default for ExplorerEndpoints {
    fn default() -> Self {
        Self {
            btc: "https://blockchain.info".to_string(),
            eth: "https://etherchain.org/api".to_string(),
            zec: "https://api.zcha.in/v2/mainnet".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BtcLatestBlock {
    height: u64,
    hash: String,
}

#[derive(Debug, Deserialize)]
struct EthEnvelope<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct EthBlockCount {
    count: u64,
}

#[derive(Debug, Deserialize)]
struct EthBlock {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct ZecNetwork {
    #[serde(rename = "blockNumber")]
    block_number: u64,
    #[serde(rename = "blockHash")]
    block_hash: String,
}

/// HTTP client for the public explorers
pub struct BlockExplorer {
    client: Client,
    endpoints: ExplorerEndpoints,
}

impl BlockExplorer {
    /// Create a client for the default explorers
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_endpoints(ExplorerEndpoints::default(), timeout)
    }

    /// Create a client for custom explorer base URLs
    pub fn with_endpoints(endpoints: ExplorerEndpoints, timeout: Duration) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .map_err(Error::from)?;

        Ok(Self { client, endpoints })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("Fetching {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::explorer(format!(
                "API call {} returned status code {}",
                url,
                status.as_u16()
            )));
        }

        Ok(response.json().await?)
    }

    async fn latest_btc(&self) -> Result<LatestBlock> {
        let url = format!("{}/latestblock", self.endpoints.btc);
        let block: BtcLatestBlock = self.get_json(&url).await?;
        Ok(LatestBlock::new(block.height, &block.hash))
    }

    async fn latest_eth(&self) -> Result<LatestBlock> {
        let url = format!("{}/blocks/count", self.endpoints.eth);
        let counts: EthEnvelope<EthBlockCount> = self.get_json(&url).await?;
        let count = counts
            .data
            .first()
            .map(|c| c.count)
            .ok_or_else(|| Error::explorer("empty ETH block count response"))?;

        let url = format!("{}/block/{}", self.endpoints.eth, count);
        let blocks: EthEnvelope<EthBlock> = self.get_json(&url).await?;
        let block = blocks
            .data
            .first()
            .ok_or_else(|| Error::explorer(format!("ETH block {} not found", count)))?;

        Ok(LatestBlock::new(count, &block.hash))
    }

    async fn latest_zec(&self) -> Result<LatestBlock> {
        let url = format!("{}/network", self.endpoints.zec);
        let network: ZecNetwork = self.get_json(&url).await?;
        Ok(LatestBlock::new(network.block_number, &network.block_hash))
    }
}

#[async_trait]
impl LatestBlockSource for BlockExplorer {
    #[instrument(skip(self))]
    async fn latest_block(&self, coin: Coin) -> Result<LatestBlock> {
        let block = match coin {
            Coin::Btc => self.latest_btc().await?,
            Coin::Eth => self.latest_eth().await?,
            Coin::Zec => self.latest_zec().await?,
        };
        debug!("Latest {} block: {}", coin, block.token_text(coin));
        Ok(block)
    }
}
