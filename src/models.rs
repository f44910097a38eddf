//! Registry of the pay-per-request models served behind x402.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// Price of one request to any model, in micro-USDC.
pub const PRICE_PER_REQUEST_MICRO_USDC: u64 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    Qwen,
    Glm,
    Kimi,
    DeepSeekR1,
    DeepSeekV3,
    GptOss,
}

impl ModelId {
    pub const ALL: [ModelId; 6] = [
        ModelId::Qwen,
        ModelId::Glm,
        ModelId::Kimi,
        ModelId::DeepSeekR1,
        ModelId::DeepSeekV3,
        ModelId::GptOss,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Qwen => "qwen",
            ModelId::Glm => "glm",
            ModelId::Kimi => "kimi",
            ModelId::DeepSeekR1 => "deepseek-r1-0528",
            ModelId::DeepSeekV3 => "deepseek-v3.1",
            ModelId::GptOss => "gpt-oss",
        }
    }

    pub fn info(&self) -> &'static ModelInfo {
        match self {
            ModelId::Qwen => &MODELS[0],
            ModelId::Glm => &MODELS[1],
            ModelId::Kimi => &MODELS[2],
            ModelId::DeepSeekR1 => &MODELS[3],
            ModelId::DeepSeekV3 => &MODELS[4],
            ModelId::GptOss => &MODELS[5],
        }
    }
}

impl Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| Error::UnknownModel(s.to_string()))
    }
}

impl Serialize for ModelId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ModelId::from_str(&s).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub id: ModelId,
    pub name: &'static str,
    pub description: &'static str,
    /// Path relative to the client's base URL
    pub endpoint: &'static str,
    /// Display price, e.g. `$0.01`
    pub price: &'static str,
    #[serde(rename = "priceInMicroUSDC")]
    pub price_in_micro_usdc: u64,
}

pub static MODELS: [ModelInfo; 6] = [
    ModelInfo {
        id: ModelId::Qwen,
        name: "Qwen 3 Coder 480B",
        description: "Advanced code generation and analysis model",
        endpoint: "/api/x402/llm/qwen",
        price: "$0.01",
        price_in_micro_usdc: PRICE_PER_REQUEST_MICRO_USDC,
    },
    ModelInfo {
        id: ModelId::Glm,
        name: "GLM 4.5",
        description: "Advanced reasoning and problem-solving model",
        endpoint: "/api/x402/llm/glm",
        price: "$0.01",
        price_in_micro_usdc: PRICE_PER_REQUEST_MICRO_USDC,
    },
    ModelInfo {
        id: ModelId::Kimi,
        name: "Kimi K2",
        description: "Long context understanding and analysis",
        endpoint: "/api/x402/llm/kimi",
        price: "$0.01",
        price_in_micro_usdc: PRICE_PER_REQUEST_MICRO_USDC,
    },
    ModelInfo {
        id: ModelId::DeepSeekR1,
        name: "DeepSeek R1 0528",
        description: "Latest reasoning model with online capabilities",
        endpoint: "/api/x402/llm/deepseek-r1-0528",
        price: "$0.01",
        price_in_micro_usdc: PRICE_PER_REQUEST_MICRO_USDC,
    },
    ModelInfo {
        id: ModelId::DeepSeekV3,
        name: "DeepSeek V3.1",
        description: "Efficient chat model with competitive performance",
        endpoint: "/api/x402/llm/deepseek-v3.1",
        price: "$0.01",
        price_in_micro_usdc: PRICE_PER_REQUEST_MICRO_USDC,
    },
    ModelInfo {
        id: ModelId::GptOss,
        name: "GPT-OSS",
        description: "OpenAI's efficient model for general tasks",
        endpoint: "/api/x402/llm/gpt-oss",
        price: "$0.01",
        price_in_micro_usdc: PRICE_PER_REQUEST_MICRO_USDC,
    },
];

/// Cost estimate for one request. Pricing is flat, so the estimate is the price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CostEstimate {
    pub model: &'static str,
    pub price_per_request: &'static str,
    pub estimated_cost: &'static str,
}

impl From<&ModelInfo> for CostEstimate {
    fn from(info: &ModelInfo) -> Self {
        CostEstimate {
            model: info.name,
            price_per_request: info.price,
            estimated_cost: info.price,
        }
    }
}
