use chrono::{TimeZone, Utc};
use tourstore::tour::{Difficulty, Tour};
use tourstore::{StoreError, TourCatalog};

fn date(year: i32, month: u32, day: u32) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
}

fn tour(name: &str, difficulty: Difficulty, rating: f64, price: f64) -> Tour {
    let mut t = Tour::new(name, difficulty, price, "a report fixture", "cover.jpg");
    t.ratings_average = rating;
    t.ratings_quantity = 10;
    t
}

#[test]
fn monthly_plan_groups_start_dates_by_calendar_month() {
    let catalog = TourCatalog::new();
    let mut a = tour("The March Wanderer", Difficulty::Easy, 4.8, 100.0);
    a.start_dates = vec![date(2021, 3, 5), date(2021, 7, 1)];
    let mut b = tour("The Spring Rambler", Difficulty::Easy, 4.8, 100.0);
    b.start_dates = vec![date(2021, 3, 20)];
    let mut c = tour("The Winter Drifter", Difficulty::Easy, 4.8, 100.0);
    c.start_dates = vec![date(2020, 3, 10)]; // wrong year, must not count
    catalog.tours().create(&a).unwrap();
    catalog.tours().create(&b).unwrap();
    catalog.tours().create(&c).unwrap();

    let plan = catalog.tours().monthly_plan(2021).unwrap();
    assert_eq!(plan.len(), 2);
    // busiest month first
    assert_eq!(plan[0].month, 3);
    assert_eq!(plan[0].num_tour_starts, 2);
    let mut names = plan[0].tours.clone();
    names.sort();
    assert_eq!(names, vec!["The March Wanderer", "The Spring Rambler"]);
    assert_eq!(plan[1].month, 7);
    assert_eq!(plan[1].num_tour_starts, 1);
}

#[test]
fn monthly_plan_never_exceeds_twelve_groups_and_covers_year_bounds() {
    let catalog = TourCatalog::new();
    for month in 1..=12 {
        let mut t = tour(
            &format!("The Month {month:02} Special"),
            Difficulty::Medium,
            4.6,
            250.0,
        );
        // several starts per month, including the year's first and last days
        t.start_dates = vec![date(2021, month, 1), date(2021, month, 15)];
        if month == 1 {
            t.start_dates.push(Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap());
        }
        if month == 12 {
            t.start_dates.push(Utc.with_ymd_and_hms(2021, 12, 31, 23, 0, 0).unwrap());
        }
        catalog.tours().create(&t).unwrap();
    }
    let plan = catalog.tours().monthly_plan(2021).unwrap();
    assert_eq!(plan.len(), 12);
    assert_eq!(plan[0].num_tour_starts, 3); // january or december, both have 3
    assert!(plan.iter().all(|m| (1..=12).contains(&m.month)));
}

#[test]
fn monthly_plan_excludes_secret_tours() {
    let catalog = TourCatalog::new();
    let mut s = tour("The Clandestine Trek", Difficulty::Easy, 4.9, 100.0);
    s.start_dates = vec![date(2021, 5, 5)];
    s.secret_tour = true;
    catalog.tours().create(&s).unwrap();

    assert!(catalog.tours().monthly_plan(2021).unwrap().is_empty());
}

#[test]
fn monthly_plan_rejects_non_four_digit_years() {
    let catalog = TourCatalog::new();
    for year in [0, 999, 10_000, -2021] {
        match catalog.tours().monthly_plan(year) {
            Err(StoreError::Aggregation(_)) => {}
            other => panic!("year {year}: unexpected {other:?}"),
        }
    }
}

#[test]
fn tour_stats_groups_well_rated_tours_by_difficulty() {
    let catalog = TourCatalog::new();
    catalog.tours().create(&tour("The Cheap Easy One", Difficulty::Easy, 4.6, 100.0)).unwrap();
    catalog.tours().create(&tour("The Dear Easy One", Difficulty::Easy, 4.8, 300.0)).unwrap();
    catalog
        .tours()
        .create(&tour("The Hardest One Yet", Difficulty::Difficult, 4.9, 50.0))
        .unwrap();
    // below the 4.5 cut, must not contribute
    catalog.tours().create(&tour("The Unloved Outing", Difficulty::Easy, 3.0, 999.0)).unwrap();

    let stats = catalog.tours().tour_stats().unwrap();
    assert_eq!(stats.len(), 2);
    // ascending average price: difficult (50) before easy (200)
    assert_eq!(stats[0].difficulty, "difficult");
    assert_eq!(stats[0].num_tours, 1);
    assert_eq!(stats[1].difficulty, "easy");
    assert_eq!(stats[1].num_tours, 2);
    assert_eq!(stats[1].num_ratings, 20);
    assert_eq!(stats[1].avg_price, 200.0);
    assert_eq!(stats[1].min_price, 100.0);
    assert_eq!(stats[1].max_price, 300.0);
    assert!((stats[1].avg_rating - 4.7).abs() < 1e-9);
}

#[test]
fn tour_stats_is_empty_when_nothing_clears_the_rating_cut() {
    let catalog = TourCatalog::new();
    catalog.tours().create(&tour("The Mediocre Stroll", Difficulty::Easy, 4.0, 100.0)).unwrap();
    catalog.tours().create(&tour("The Passable Saunter", Difficulty::Medium, 4.4, 200.0)).unwrap();
    assert!(catalog.tours().tour_stats().unwrap().is_empty());
}

#[test]
fn tour_stats_excludes_secret_tours() {
    let catalog = TourCatalog::new();
    let mut s = tour("The Classified Climb", Difficulty::Difficult, 5.0, 100.0);
    s.secret_tour = true;
    catalog.tours().create(&s).unwrap();
    assert!(catalog.tours().tour_stats().unwrap().is_empty());
}
