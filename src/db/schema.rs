pub const SCHEMA: &str = r#"
-- tracked_items table
CREATE TABLE IF NOT EXISTS tracked_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    catalog_id INTEGER NOT NULL UNIQUE,
    name TEXT NOT NULL,
    season_count INTEGER NOT NULL DEFAULT 1,
    status TEXT NOT NULL DEFAULT 'unknown',
    origin_country TEXT NOT NULL DEFAULT '',
    availability_label TEXT NOT NULL DEFAULT 'TBD',
    label_is_manual INTEGER NOT NULL DEFAULT 0,
    is_archived INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tracked_items_archived ON tracked_items(is_archived);

-- episodes table
CREATE TABLE IF NOT EXISTS episodes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    catalog_id INTEGER NOT NULL,
    season INTEGER NOT NULL,
    episode INTEGER NOT NULL,
    title TEXT NOT NULL DEFAULT '',
    synopsis TEXT NOT NULL DEFAULT '',
    air_date TEXT,
    UNIQUE(catalog_id, season, episode)
);

CREATE INDEX IF NOT EXISTS idx_episodes_catalog_id ON episodes(catalog_id);
CREATE INDEX IF NOT EXISTS idx_episodes_air_date ON episodes(air_date);

-- reminders table
CREATE TABLE IF NOT EXISTS reminders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id INTEGER NOT NULL REFERENCES tracked_items(id),
    kind TEXT NOT NULL,
    description TEXT NOT NULL,
    is_completed INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_reminders_item_kind ON reminders(item_id, kind);
CREATE INDEX IF NOT EXISTS idx_reminders_completed ON reminders(is_completed);

-- document_cache table (one provider snapshot per catalog id)
CREATE TABLE IF NOT EXISTS document_cache (
    catalog_id INTEGER PRIMARY KEY,
    payload TEXT NOT NULL,
    language TEXT NOT NULL,
    fetched_at TEXT NOT NULL
);
"#;
