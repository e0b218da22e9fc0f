use anyhow::Result;
use duckdb::Connection;
use ghent_etl::{
    fetch::urls::{
        cache_name, crime_dataset, CITY_POPULATION_DATASET, CRIME_YEARS, DISTRICT_DATASET,
        DISTRICT_POPULATION_DATASET,
    },
    pipeline, Config,
};
use std::{
    collections::HashMap,
    fs,
    io::{BufRead, BufReader, Write},
    net::TcpListener,
    path::Path,
    thread::{self, JoinHandle},
};
use tempfile::tempdir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use url::Url;

type CrimeRow = (i64, i64, i64, i64, i64, i64);

fn init_test_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ghent_etl=debug")),
        )
        .with_test_writer()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Source exports keyed by portal dataset id.
fn fixtures() -> Vec<(String, String)> {
    let mut out = vec![
        (
            DISTRICT_DATASET.to_string(),
            "Geo Point;Geo Shape;nieuwnr;naam;wijk\n\
             51.05, 3.72;{};1;Binnenstad;Centrum\n\
             51.06, 3.70;{};2;Brugse Poort - Rooigem;Brugse Poort\n"
                .to_string(),
        ),
        (
            DISTRICT_POPULATION_DATASET.to_string(),
            "wijk;wijkcode;Period;ValueString\n\
             Centrum;1;2020;19417\n\
             Centrum;1;2021;19611\n\
             Brugse Poort;2;2020;17700\n"
                .to_string(),
        ),
        (
            CITY_POPULATION_DATASET.to_string(),
            "Period;ValueString\n2020;263703\n2021;265086\n".to_string(),
        ),
    ];

    for year in CRIME_YEARS {
        let mut body = format!(
            "jaar_maand;Categorie;Wijkcode;Wijk;Totaal\n\
             {y}-01-01;Diefstal;1;Centrum;3\n\
             {y}-02-01;Diefstal;1;Centrum;2\n\
             {y}-05-01;Diefstal;1;Centrum;4\n\
             {y}-01-01;Diefstal;2;Brugse Poort;1\n",
            y = year
        );
        if year == 2019 {
            body.push_str("2019-05-01;Verkeerongevallen;1;Centrum;4\n");
            body.push_str("2019-06-01;Verkeersongevallen;1;Centrum;1\n");
        }
        if year == 2021 {
            body.push_str("2021-11-01;Vandalisme;2;Brugse Poort;6\n");
        }
        out.push((crime_dataset(year), body));
    }
    out
}

fn seed_staging(dir: &Path, skip: Option<&str>) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (dataset, body) in fixtures() {
        if Some(dataset.as_str()) != skip {
            fs::write(dir.join(cache_name(&dataset)), body)?;
        }
    }
    Ok(())
}

fn offline_config(root: &Path) -> Result<Config> {
    Ok(Config {
        staging_dir: root.join("staging"),
        database: root.join("ghent-data.duckdb"),
        schema: None,
        // nothing listens on the discard port
        portal_url: Url::parse("http://127.0.0.1:9/")?,
    })
}

/// Serve each fixture once, by the dataset id in the export path.
fn serve_portal(requests: usize) -> (Url, JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies: HashMap<String, String> = fixtures().into_iter().collect();

    let handle = thread::spawn(move || {
        let mut served = 0;
        for _ in 0..requests {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            loop {
                let mut header = String::new();
                if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
                    break;
                }
            }

            let dataset = request_line
                .split("/datasets/")
                .nth(1)
                .and_then(|rest| rest.split("/exports/").next())
                .unwrap_or_default();
            let (status, body) = match bodies.get(dataset) {
                Some(body) => {
                    served += 1;
                    ("200 OK", body.as_str())
                }
                None => ("404 Not Found", ""),
            };
            let mut stream = reader.into_inner();
            let _ = write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
        }
        served
    });
    (Url::parse(&format!("http://{}/", addr)).unwrap(), handle)
}

fn count(conn: &Connection, sql: &str) -> Result<i64> {
    Ok(conn.query_row(sql, [], |r| r.get(0))?)
}

fn crime_rows(db: &Path) -> Result<Vec<CrimeRow>> {
    let conn = Connection::open(db)?;
    let mut stmt = conn.prepare(
        "SELECT jaar_maand, misdrijf_categorie_id, stadswijk_id, misdrijf_aantal, \
                misdrijf_kwartaal_totaal, misdrijf_jaar_totaal \
         FROM misdrijf ORDER BY jaar_maand, misdrijf_categorie_id, stadswijk_id",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?))
        })?
        .collect::<duckdb::Result<Vec<CrimeRow>>>()?;
    Ok(rows)
}

#[test]
fn rebuilds_every_table_from_staged_exports() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let config = offline_config(dir.path())?;
    seed_staging(&config.staging_dir, None)?;

    let summary = pipeline::run(&config)?;
    assert_eq!(
        summary.tables,
        vec![
            ("datum", 2557),
            ("bevolkingsaantal", 2),
            ("stadswijk", 2),
            ("stadswijk_bevolkingsaantal", 3),
            ("misdrijf", 27),
            ("misdrijf_categorie", 3),
        ]
    );

    let conn = Connection::open(&config.database)?;
    assert_eq!(count(&conn, "SELECT COUNT(DISTINCT datum_id) FROM datum")?, 2557);
    assert_eq!(count(&conn, "SELECT MIN(datum_id) FROM datum")?, 20180101);
    assert_eq!(count(&conn, "SELECT MAX(datum_id) FROM datum")?, 20241231);

    let categories: Vec<(String, i64)> = conn
        .prepare(
            "SELECT misdrijf_categorie_naam, misdrijf_categorie_id \
             FROM misdrijf_categorie ORDER BY misdrijf_categorie_id",
        )?
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<duckdb::Result<_>>()?;
    assert_eq!(
        categories,
        vec![
            ("Diefstal".to_string(), 1),
            ("Verkeersongevallen".to_string(), 2),
            ("Vandalisme".to_string(), 3),
        ]
    );

    // the misspelled and the correct name collapse into one category
    let accident: (i64, i64, i64, i64) = conn.query_row(
        "SELECT misdrijf_categorie_id, misdrijf_aantal, misdrijf_kwartaal_totaal, misdrijf_jaar_totaal \
         FROM misdrijf WHERE jaar_maand = 20190501 AND misdrijf_categorie_id = 2",
        [],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
    )?;
    assert_eq!(accident, (2, 4, 5, 5));

    // rollups agree with the monthly counts they summarise
    let bad_rollups = count(
        &conn,
        "SELECT COUNT(*) FROM misdrijf m \
         JOIN (SELECT jaar_maand // 10000 AS jaar, stadswijk_id, misdrijf_categorie_id, \
                      SUM(misdrijf_aantal) AS totaal \
               FROM misdrijf GROUP BY 1, 2, 3) g \
           ON m.jaar_maand // 10000 = g.jaar \
          AND m.stadswijk_id = g.stadswijk_id \
          AND m.misdrijf_categorie_id = g.misdrijf_categorie_id \
         WHERE m.misdrijf_jaar_totaal <> g.totaal \
            OR m.misdrijf_kwartaal_totaal < m.misdrijf_aantal \
            OR m.misdrijf_jaar_totaal < m.misdrijf_kwartaal_totaal",
    )?;
    assert_eq!(bad_rollups, 0);

    let orphan_months = count(
        &conn,
        "SELECT COUNT(*) FROM misdrijf m LEFT JOIN datum d ON m.jaar_maand = d.datum_id \
         WHERE d.datum_id IS NULL",
    )?;
    assert_eq!(orphan_months, 0);

    assert_eq!(
        count(&conn, "SELECT CAST(SUM(bevolkingsaantal) AS BIGINT) FROM stadswijk_bevolkingsaantal")?,
        19417 + 19611 + 17700
    );
    Ok(())
}

#[test]
fn cached_run_matches_downloaded_run() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let (portal_url, server) = serve_portal(3 + CRIME_YEARS.count());
    let config = Config {
        portal_url,
        ..offline_config(dir.path())?
    };

    let downloaded = pipeline::run(&config)?;
    assert_eq!(server.join().unwrap(), 9);
    let fresh_rows = crime_rows(&config.database)?;

    // portal is gone now, so every export must come from the staging cache
    let cached = pipeline::run(&config)?;
    assert_eq!(downloaded, cached);
    assert_eq!(crime_rows(&config.database)?, fresh_rows);

    // and a cache seeded by hand gives the same records
    let seeded_dir = tempdir()?;
    let seeded = offline_config(seeded_dir.path())?;
    seed_staging(&seeded.staging_dir, None)?;
    pipeline::run(&seeded)?;
    assert_eq!(crime_rows(&seeded.database)?, fresh_rows);
    Ok(())
}

#[test]
fn failed_fetch_aborts_after_earlier_tables() -> Result<()> {
    init_test_logging();
    let dir = tempdir()?;
    let config = offline_config(dir.path())?;
    seed_staging(&config.staging_dir, Some(&crime_dataset(2023)))?;

    let err = pipeline::run(&config).unwrap_err();
    assert!(format!("{:#}", err).contains("crime data for 2023"), "{:#}", err);

    let conn = Connection::open(&config.database)?;
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM datum")?, 2557);
    // 2018..=2022 were appended before the failure
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM misdrijf")?, 4 * 5 + 2 + 1);
    assert_eq!(count(&conn, "SELECT COUNT(*) FROM misdrijf_categorie")?, 0);
    drop(conn);

    // staging the missing year makes the next run succeed from scratch
    seed_staging(&config.staging_dir, None)?;
    let summary = pipeline::run(&config)?;
    assert_eq!(summary.rows("misdrijf"), Some(27));
    Ok(())
}
