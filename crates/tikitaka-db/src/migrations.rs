use anyhow::Result;
use sqlx::SqlitePool;
use tracing::info;

pub async fn run(pool: &SqlitePool) -> Result<()> {
    sqlx::raw_sql(
        "
        CREATE TABLE IF NOT EXISTS teams (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            name            TEXT NOT NULL UNIQUE,
            logo_url        TEXT,
            flag_url        TEXT,
            confederation   TEXT NOT NULL
                CHECK (confederation IN ('UEFA', 'CONMEBOL', 'CONCACAF', 'CAF', 'AFC', 'OFC')),
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS users (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            email           TEXT NOT NULL UNIQUE,
            username        TEXT NOT NULL UNIQUE,
            password        TEXT NOT NULL,
            full_name       TEXT NOT NULL,
            first_name      TEXT,
            last_name       TEXT,
            bio             TEXT,
            profile_image   TEXT,
            team_id         INTEGER NOT NULL REFERENCES teams(id),
            is_active       BOOLEAN NOT NULL DEFAULT 1,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_users_team ON users(team_id);

        CREATE TABLE IF NOT EXISTS posts (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            team_id         INTEGER NOT NULL REFERENCES teams(id),
            content         TEXT NOT NULL,
            image_url       TEXT,
            is_draft        BOOLEAN NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_posts_feed ON posts(is_draft, created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_posts_team ON posts(team_id, created_at);

        CREATE TABLE IF NOT EXISTS post_likes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id         INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_post_likes_post ON post_likes(post_id);

        CREATE TABLE IF NOT EXISTS user_favorites (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            post_id         INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, post_id)
        );

        CREATE INDEX IF NOT EXISTS idx_user_favorites_post ON user_favorites(post_id);

        CREATE TABLE IF NOT EXISTS comments (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            post_id         INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            content         TEXT NOT NULL,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at);

        CREATE TABLE IF NOT EXISTS comment_likes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            comment_id      INTEGER NOT NULL REFERENCES comments(id) ON DELETE CASCADE,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, comment_id)
        );

        CREATE INDEX IF NOT EXISTS idx_comment_likes_comment ON comment_likes(comment_id);

        CREATE TABLE IF NOT EXISTS notifications (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            type            TEXT NOT NULL,
            title           TEXT NOT NULL,
            body            TEXT NOT NULL,
            data            TEXT NOT NULL DEFAULT '{}',
            is_read         BOOLEAN NOT NULL DEFAULT 0,
            created_at      TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at);

        -- Seed the team directory
        INSERT OR IGNORE INTO teams (name, logo_url, flag_url, confederation) VALUES
            ('Argentina',     'https://flagcdn.com/w80/ar.png', 'https://flagcdn.com/w320/ar.png', 'CONMEBOL'),
            ('Brazil',        'https://flagcdn.com/w80/br.png', 'https://flagcdn.com/w320/br.png', 'CONMEBOL'),
            ('Uruguay',       'https://flagcdn.com/w80/uy.png', 'https://flagcdn.com/w320/uy.png', 'CONMEBOL'),
            ('Colombia',      'https://flagcdn.com/w80/co.png', 'https://flagcdn.com/w320/co.png', 'CONMEBOL'),
            ('Peru',          'https://flagcdn.com/w80/pe.png', 'https://flagcdn.com/w320/pe.png', 'CONMEBOL'),
            ('Spain',         'https://flagcdn.com/w80/es.png', 'https://flagcdn.com/w320/es.png', 'UEFA'),
            ('France',        'https://flagcdn.com/w80/fr.png', 'https://flagcdn.com/w320/fr.png', 'UEFA'),
            ('Germany',       'https://flagcdn.com/w80/de.png', 'https://flagcdn.com/w320/de.png', 'UEFA'),
            ('England',       'https://flagcdn.com/w80/gb-eng.png', 'https://flagcdn.com/w320/gb-eng.png', 'UEFA'),
            ('Portugal',      'https://flagcdn.com/w80/pt.png', 'https://flagcdn.com/w320/pt.png', 'UEFA'),
            ('Italy',         'https://flagcdn.com/w80/it.png', 'https://flagcdn.com/w320/it.png', 'UEFA'),
            ('Netherlands',   'https://flagcdn.com/w80/nl.png', 'https://flagcdn.com/w320/nl.png', 'UEFA'),
            ('Mexico',        'https://flagcdn.com/w80/mx.png', 'https://flagcdn.com/w320/mx.png', 'CONCACAF'),
            ('United States', 'https://flagcdn.com/w80/us.png', 'https://flagcdn.com/w320/us.png', 'CONCACAF'),
            ('Canada',        'https://flagcdn.com/w80/ca.png', 'https://flagcdn.com/w320/ca.png', 'CONCACAF'),
            ('Morocco',       'https://flagcdn.com/w80/ma.png', 'https://flagcdn.com/w320/ma.png', 'CAF'),
            ('Senegal',       'https://flagcdn.com/w80/sn.png', 'https://flagcdn.com/w320/sn.png', 'CAF'),
            ('Nigeria',       'https://flagcdn.com/w80/ng.png', 'https://flagcdn.com/w320/ng.png', 'CAF'),
            ('Japan',         'https://flagcdn.com/w80/jp.png', 'https://flagcdn.com/w320/jp.png', 'AFC'),
            ('South Korea',   'https://flagcdn.com/w80/kr.png', 'https://flagcdn.com/w320/kr.png', 'AFC'),
            ('Australia',     'https://flagcdn.com/w80/au.png', 'https://flagcdn.com/w320/au.png', 'AFC'),
            ('New Zealand',   'https://flagcdn.com/w80/nz.png', 'https://flagcdn.com/w320/nz.png', 'OFC');
        ",
    )
    .execute(pool)
    .await?;

    info!("Database migrations complete");
    Ok(())
}
