use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table("albums")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("title").string_len(200).not_null())
                    .col(ColumnDef::new("author").string_len(200).not_null())
                    .col(ColumnDef::new("image").string_len(200))
                    .col(ColumnDef::new("price").double().not_null().default(0.0))
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_albums_author_title")
                    .table("albums")
                    .col("author")
                    .col("title")
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table("tracks")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("title").string_len(200).not_null())
                    .col(ColumnDef::new("author").string_len(200).not_null())
                    .col(ColumnDef::new("album_id").integer())
                    .col(ColumnDef::new("price").double().not_null().default(0.0))
                    .col(ColumnDef::new("free_version").text())
                    .col(ColumnDef::new("full_version").text())
                    .col(ColumnDef::new("created_at").timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tracks_album_id")
                            .from("tracks", "album_id")
                            .to("albums", "id")
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_author_title")
                    .table("tracks")
                    .col("author")
                    .col("title")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table("tracks").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("albums").to_owned())
            .await?;

        Ok(())
    }
}
