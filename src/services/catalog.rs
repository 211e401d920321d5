use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, sea_query::LikeExpr,
};
use tracing::instrument;

use crate::database::Database;
use crate::entities;
use crate::services::pagination::{MAX_PAGE_SIZE, PageRequest, PaginatedResult, fetch_page};
use crate::services::purchase::Ownership;

#[derive(Debug, Clone)]
pub struct AlbumView {
    pub album: entities::album::Model,
    pub track_ids: Vec<i64>,
    pub is_bought: bool,
}

#[derive(Debug, Clone)]
pub struct TrackView {
    pub track: entities::track::Model,
    pub is_bought: bool,
    pub is_liked: bool,
}

impl TrackView {
    /// The full version for owners, the free preview for everyone else.
    pub fn content(&self) -> Option<&str> {
        if self.is_bought {
            self.track.full_version.as_deref()
        } else {
            self.track.free_version.as_deref()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AlbumSummary {
    pub album: entities::album::Model,
    pub track_count: u64,
}

#[derive(Debug, Default)]
pub struct SearchResults {
    pub albums: Vec<AlbumView>,
    pub tracks: Vec<TrackView>,
}

/// Per-request knowledge about the viewer: what they own and what they like.
#[derive(Debug, Default)]
struct Viewer {
    ownership: Ownership,
    liked: HashSet<i64>,
}

impl Viewer {
    async fn load<C>(conn: &C, user_id: Option<i64>) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let ownership = Ownership::load(conn, user_id).await?;
        let liked = match user_id {
            Some(user_id) => entities::like_track::Entity::find()
                .filter(entities::like_track::Column::UserId.eq(user_id))
                .all(conn)
                .await?
                .into_iter()
                .map(|like| like.track_id)
                .collect(),
            None => HashSet::new(),
        };
        Ok(Self { ownership, liked })
    }

    fn track_view(&self, track: entities::track::Model) -> TrackView {
        TrackView {
            is_bought: self.ownership.owns_track(&track),
            is_liked: self.liked.contains(&track.id),
            track,
        }
    }
}

pub struct CatalogService {
    db: Arc<Database>,
}

impl CatalogService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub async fn list_albums(
        &self,
        viewer: Option<i64>,
        page: PageRequest,
    ) -> Result<PaginatedResult<AlbumView>, DbErr> {
        let query = entities::album::Entity::find().order_by_asc(entities::album::Column::Id);
        let albums = fetch_page(query, &self.db.conn, page).await?;
        let ownership = Ownership::load(&self.db.conn, viewer).await?;
        let mut track_ids = self.track_ids_by_album(&albums.items).await?;

        Ok(albums.map(|album| AlbumView {
            is_bought: ownership.owns_album(album.id),
            track_ids: track_ids.remove(&album.id).unwrap_or_default(),
            album,
        }))
    }

    pub async fn get_album(
        &self,
        viewer: Option<i64>,
        album_id: i64,
    ) -> Result<Option<AlbumView>, DbErr> {
        let Some(album) = entities::album::Entity::find_by_id(album_id)
            .one(&self.db.conn)
            .await?
        else {
            return Ok(None);
        };

        let ownership = Ownership::load(&self.db.conn, viewer).await?;
        let mut track_ids = self.track_ids_by_album(std::slice::from_ref(&album)).await?;

        Ok(Some(AlbumView {
            is_bought: ownership.owns_album(album.id),
            track_ids: track_ids.remove(&album.id).unwrap_or_default(),
            album,
        }))
    }

    pub async fn list_tracks(
        &self,
        viewer: Option<i64>,
        page: PageRequest,
    ) -> Result<PaginatedResult<TrackView>, DbErr> {
        let query = entities::track::Entity::find().order_by_asc(entities::track::Column::Id);
        let tracks = fetch_page(query, &self.db.conn, page).await?;
        let viewer = Viewer::load(&self.db.conn, viewer).await?;

        Ok(tracks.map(|track| viewer.track_view(track)))
    }

    pub async fn get_track(
        &self,
        viewer: Option<i64>,
        track_id: i64,
    ) -> Result<Option<TrackView>, DbErr> {
        let Some(track) = entities::track::Entity::find_by_id(track_id)
            .one(&self.db.conn)
            .await?
        else {
            return Ok(None);
        };

        let viewer = Viewer::load(&self.db.conn, viewer).await?;
        Ok(Some(viewer.track_view(track)))
    }

    /// Albums and tracks whose title or author contains `term`.
    #[instrument(skip(self))]
    pub async fn search(&self, viewer: Option<i64>, term: &str) -> Result<SearchResults, DbErr> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(SearchResults::default());
        }

        let albums = text_search(
            entities::album::Entity::find(),
            [entities::album::Column::Title, entities::album::Column::Author],
            term,
        )
        .order_by_asc(entities::album::Column::Id)
        .limit(MAX_PAGE_SIZE)
        .all(&self.db.conn)
        .await?;

        let tracks = text_search(
            entities::track::Entity::find(),
            [entities::track::Column::Title, entities::track::Column::Author],
            term,
        )
        .order_by_asc(entities::track::Column::Id)
        .limit(MAX_PAGE_SIZE)
        .all(&self.db.conn)
        .await?;

        let viewer = Viewer::load(&self.db.conn, viewer).await?;
        let mut track_ids = self.track_ids_by_album(&albums).await?;

        Ok(SearchResults {
            albums: albums
                .into_iter()
                .map(|album| AlbumView {
                    is_bought: viewer.ownership.owns_album(album.id),
                    track_ids: track_ids.remove(&album.id).unwrap_or_default(),
                    album,
                })
                .collect(),
            tracks: tracks
                .into_iter()
                .map(|track| viewer.track_view(track))
                .collect(),
        })
    }

    /// Albums the user bought, most recent purchase first.
    pub async fn bought_albums(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<PaginatedResult<AlbumView>, DbErr> {
        let query = entities::bought_album::Entity::find()
            .filter(entities::bought_album::Column::UserId.eq(user_id))
            .order_by_desc(entities::bought_album::Column::CreatedAt)
            .order_by_desc(entities::bought_album::Column::Id);
        let records = fetch_page(query, &self.db.conn, page).await?;

        let page = records.map(|record| record.item_id);

        let albums = entities::album::Entity::find()
            .filter(entities::album::Column::Id.is_in(page.items.clone()))
            .all(&self.db.conn)
            .await?;
        let mut track_ids = self.track_ids_by_album(&albums).await?;
        let mut albums: HashMap<i64, entities::album::Model> =
            albums.into_iter().map(|album| (album.id, album)).collect();

        let items = page
            .items
            .iter()
            .filter_map(|id| albums.remove(id))
            .map(|album| AlbumView {
                track_ids: track_ids.remove(&album.id).unwrap_or_default(),
                is_bought: true,
                album,
            })
            .collect();

        Ok(PaginatedResult {
            items,
            total_count: page.total_count,
            page: page.page,
            page_size: page.page_size,
        })
    }

    /// Tracks the user bought on their own, most recent purchase first.
    pub async fn bought_tracks(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<PaginatedResult<TrackView>, DbErr> {
        let query = entities::bought_track::Entity::find()
            .filter(entities::bought_track::Column::UserId.eq(user_id))
            .order_by_desc(entities::bought_track::Column::CreatedAt)
            .order_by_desc(entities::bought_track::Column::Id);
        let records = fetch_page(query, &self.db.conn, page).await?;

        self.track_views_in_order(Some(user_id), records.map(|record| record.item_id))
            .await
    }

    /// Every album with the number of tracks it holds, for the admin album table.
    pub async fn albums_with_track_counts(&self) -> Result<Vec<AlbumSummary>, DbErr> {
        let albums = entities::album::Entity::find()
            .order_by_asc(entities::album::Column::Id)
            .all(&self.db.conn)
            .await?;
        let track_ids = self.track_ids_by_album(&albums).await?;

        Ok(albums
            .into_iter()
            .map(|album| AlbumSummary {
                track_count: track_ids.get(&album.id).map_or(0, |ids| ids.len() as u64),
                album,
            })
            .collect())
    }

    /// Resolve a page of track ids to views, keeping the page's order.
    async fn track_views_in_order(
        &self,
        viewer: Option<i64>,
        page: PaginatedResult<i64>,
    ) -> Result<PaginatedResult<TrackView>, DbErr> {
        let mut tracks: HashMap<i64, entities::track::Model> = entities::track::Entity::find()
            .filter(entities::track::Column::Id.is_in(page.items.clone()))
            .all(&self.db.conn)
            .await?
            .into_iter()
            .map(|track| (track.id, track))
            .collect();
        let viewer = Viewer::load(&self.db.conn, viewer).await?;

        let items = page
            .items
            .iter()
            .filter_map(|id| tracks.remove(id))
            .map(|track| viewer.track_view(track))
            .collect();

        Ok(PaginatedResult {
            items,
            total_count: page.total_count,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn track_ids_by_album(
        &self,
        albums: &[entities::album::Model],
    ) -> Result<HashMap<i64, Vec<i64>>, DbErr> {
        if albums.is_empty() {
            return Ok(HashMap::new());
        }

        let album_ids: Vec<i64> = albums.iter().map(|album| album.id).collect();
        let tracks = entities::track::Entity::find()
            .filter(entities::track::Column::AlbumId.is_in(album_ids))
            .order_by_asc(entities::track::Column::Id)
            .all(&self.db.conn)
            .await?;

        let mut by_album: HashMap<i64, Vec<i64>> = HashMap::new();
        for track in tracks {
            if let Some(album_id) = track.album_id {
                by_album.entry(album_id).or_default().push(track.id);
            }
        }
        Ok(by_album)
    }
}

fn text_search<E, C>(
    query: Select<E>,
    columns: impl IntoIterator<Item = C>,
    term: &str,
) -> Select<E>
where
    E: EntityTrait,
    C: ColumnTrait,
{
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    let pattern = LikeExpr::new(format!("%{escaped}%")).escape('\\');
    let condition = columns
        .into_iter()
        .fold(Condition::any(), |condition, column| {
            condition.add(column.like(pattern.clone()))
        });
    query.filter(condition)
}
