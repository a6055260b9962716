//! Spaces feed: fetches cards through the authorized client and lays them out.
//!
//! The masonry pass is CPU-bound; it runs on `spawn_blocking` so a long feed
//! never stalls the runtime. Cards are moved into the closure (the `'static`
//! bound) and come back inside the returned `FeedLayout`.

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::api_client::ApiClient;
use crate::errors::ClientError;
use crate::layout::{LayoutResult, MasonryLayout, Rect};
use crate::models::{SpaceCard, SpaceDto};

const SPACES_PATH: &str = "/spaces";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedCard {
    pub id: Uuid,
    pub title: String,
    pub column: usize,
    pub frame: Rect,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedLayout {
    pub cards: Vec<PlacedCard>,
    pub total_height: f32,
    pub column_width: f32,
    #[serde(skip)]
    pub result: LayoutResult,
}

/// `GET /spaces`, mapped to feed cards.
pub async fn fetch_spaces(api: &ApiClient) -> Result<Vec<SpaceCard>, ClientError> {
    let dtos: Vec<SpaceDto> = api.get_json(SPACES_PATH).await?;
    Ok(dtos.into_iter().map(SpaceCard::from).collect())
}

/// Lays `cards` out on a blocking thread.
pub async fn layout_feed(
    cards: Vec<SpaceCard>,
    layout: MasonryLayout,
    width: f32,
) -> Result<FeedLayout> {
    tokio::task::spawn_blocking(move || -> Result<FeedLayout> {
        let result = layout.layout(&cards, width)?;
        Ok(assemble(cards, result))
    })
    .await
    .context("spawn_blocking failed in feed layout")?
}

/// Places a further page of `cards` below an existing feed.
pub async fn append_feed(
    previous: FeedLayout,
    cards: Vec<SpaceCard>,
    layout: MasonryLayout,
    width: f32,
) -> Result<FeedLayout> {
    tokio::task::spawn_blocking(move || -> Result<FeedLayout> {
        let result = layout.append(&previous.result, &cards, width)?;
        let mut placed = previous.cards;
        let offset = placed.len();
        placed.extend(cards.into_iter().enumerate().map(|(i, card)| PlacedCard {
            id: card.id,
            title: card.title,
            column: result.columns[offset + i],
            frame: result.frames[offset + i],
        }));
        Ok(FeedLayout {
            cards: placed,
            total_height: result.total_height,
            column_width: result.column_width,
            result,
        })
    })
    .await
    .context("spawn_blocking failed in feed append")?
}

fn assemble(cards: Vec<SpaceCard>, result: LayoutResult) -> FeedLayout {
    let placed = cards
        .into_iter()
        .zip(result.frames.iter().zip(&result.columns))
        .map(|(card, (frame, &column))| PlacedCard {
            id: card.id,
            title: card.title,
            column,
            frame: *frame,
        })
        .collect();

    FeedLayout {
        cards: placed,
        total_height: result.total_height,
        column_width: result.column_width,
        result,
    }
}
