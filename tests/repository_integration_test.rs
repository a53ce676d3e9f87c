// ==========================================
// 仓储层集成测试
// ==========================================
// 测试目标: 学生惰性建档与刷新、学年/学期约束、
//          违纪记录主键约束、导入批次台账
// ==========================================


use chrono::{Duration, NaiveDate, Utc};
use discipline_tracker::domain::{
    AcademicLevel, FaultType, ImportBatch, ImportPhase, InfractionRecord, SchoolYear,
    StudentProfile, Trimester,
};
use discipline_tracker::repository::{
    AcademicPeriodRepository, AcademicPeriodSource, ImportBatchLedger, ImportBatchRepository,
    InfractionRepository, InfractionStore, RepositoryError, StudentRepository, StudentResolver,
};
use test_helpers::*;

fn profile(name: Option<&str>, section: Option<&str>, level: AcademicLevel) -> StudentProfile {
    StudentProfile {
        full_name: name.map(str::to_string),
        section: section.map(str::to_string),
        academic_level: level,
    }
}

fn record(hash: &str, student_id: &str, occurred_on: NaiveDate) -> InfractionRecord {
    InfractionRecord {
        hash: hash.to_string(),
        student_id: student_id.to_string(),
        student_code: "3314".to_string(),
        fault_type: FaultType::TypeII,
        fault_number: Some(12),
        description: "texto".to_string(),
        detail: None,
        remedial_actions: None,
        author: Some("Docente".to_string()),
        occurred_on,
        reported_at: occurred_on.and_hms_opt(10, 28, 0).unwrap(),
        last_edited_at: None,
        last_editor: None,
        section: Some("Décimo A".to_string()),
        academic_level: AcademicLevel::HighSchool,
        trimester_id: T2.to_string(),
        school_year_id: SCHOOL_YEAR_ID.to_string(),
        external_id: None,
    }
}

fn batch(batch_id: &str, minutes_ago: i64) -> ImportBatch {
    ImportBatch {
        batch_id: batch_id.to_string(),
        phase: ImportPhase::Preview,
        file_name: Some("faltas.csv".to_string()),
        fault_type: FaultType::TypeI,
        trimester_id: T1.to_string(),
        total_rows: 3,
        processed_rows: 2,
        created_rows: 2,
        updated_rows: 0,
        duplicate_rows: 0,
        error_rows: 1,
        errors_json: Some("[]".to_string()),
        imported_at: Utc::now() - Duration::minutes(minutes_ago),
        elapsed_ms: 12,
    }
}

// ==========================================
// StudentRepository
// ==========================================

#[tokio::test]
async fn test_student_is_created_once_and_refreshed() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let repo = StudentRepository::from_connection(conn);

    let first = repo
        .find_or_create_student(
            "3314",
            &profile(Some("Ana"), Some("Noveno B"), AcademicLevel::MiddleSchool),
        )
        .await
        .unwrap();

    // 升级到高中后再次上传
    let second = repo
        .find_or_create_student(
            "3314",
            &profile(Some("Ana María"), Some("Décimo A"), AcademicLevel::HighSchool),
        )
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.count().unwrap(), 1);

    let student = repo.find_by_code("3314").unwrap().unwrap();
    assert_eq!(student.full_name.as_deref(), Some("Ana María"));
    assert_eq!(student.section.as_deref(), Some("Décimo A"));
    assert_eq!(student.academic_level, AcademicLevel::HighSchool);

    // 空班级不覆盖已有值
    repo.find_or_create_student("3314", &profile(None, None, AcademicLevel::Unclassified))
        .await
        .unwrap();
    let student = repo.find_by_code("3314").unwrap().unwrap();
    assert_eq!(student.section.as_deref(), Some("Décimo A"));
    assert_eq!(student.academic_level, AcademicLevel::HighSchool);
}

#[tokio::test]
async fn test_student_lookup_without_auto_create() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let repo = StudentRepository::from_connection(conn).with_auto_create(false);

    let err = repo
        .find_or_create_student("404", &profile(None, None, AcademicLevel::Unclassified))
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound { ref id, .. } if id == "404"));
    assert_eq!(repo.count().unwrap(), 0);
}

// ==========================================
// AcademicPeriodRepository
// ==========================================

#[tokio::test]
async fn test_periods_are_listed_in_date_order() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let repo = AcademicPeriodRepository::from_connection(conn);

    let periods = repo.list_academic_periods(None).await.unwrap();
    let ids: Vec<_> = periods.iter().map(|p| p.trimester_id.as_str()).collect();
    assert_eq!(ids, vec![T1, T2, T3]);
    assert!(periods.iter().all(|p| p.is_active));

    let t2 = repo.find_period_by_trimester_id(T2).unwrap().unwrap();
    assert_eq!(t2.start_date, date(2025, 5, 1));
    assert_eq!(t2.end_date, date(2025, 8, 31));
    assert!(repo.find_period_by_trimester_id("missing").unwrap().is_none());
}

#[test]
fn test_only_one_school_year_is_active() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let repo = AcademicPeriodRepository::from_connection(conn);
    assert_eq!(
        repo.find_active_school_year_id().unwrap().as_deref(),
        Some(SCHOOL_YEAR_ID)
    );

    repo.create_school_year(&SchoolYear {
        school_year_id: "sy-2026".to_string(),
        name: "2026".to_string(),
        is_active: true,
        start_date: date(2026, 1, 19),
        end_date: date(2026, 11, 27),
    })
    .unwrap();
    assert_eq!(
        repo.find_active_school_year_id().unwrap().as_deref(),
        Some("sy-2026")
    );
}

#[test]
fn test_trimester_validation() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let repo = AcademicPeriodRepository::from_connection(conn);

    let base = Trimester {
        trimester_id: "t4".to_string(),
        school_year_id: SCHOOL_YEAR_ID.to_string(),
        name: "Cuarto".to_string(),
        order: 4,
        start_date: date(2025, 12, 1),
        end_date: date(2025, 12, 20),
    };
    let err = repo.create_trimester(&base).unwrap_err();
    assert!(matches!(err, RepositoryError::FieldValueError { ref field, .. } if field == "order"));

    let reversed = Trimester {
        order: 1,
        start_date: date(2025, 12, 20),
        end_date: date(2025, 12, 1),
        ..base.clone()
    };
    let err = repo.create_trimester(&reversed).unwrap_err();
    assert!(matches!(err, RepositoryError::FieldValueError { ref field, .. } if field == "start_date"));

    // 同一学年内顺序号唯一
    let same_order = Trimester { order: 1, ..base };
    let err = repo.create_trimester(&same_order).unwrap_err();
    assert!(err.is_unique_violation());
}

#[tokio::test]
async fn test_school_year_with_trimesters_is_all_or_nothing() {
    let (_file, db_path) = create_test_db().unwrap();
    let repo = AcademicPeriodRepository::from_connection(open_shared(&db_path).unwrap());

    let year = SchoolYear {
        school_year_id: "sy-2026".to_string(),
        name: "2026".to_string(),
        is_active: true,
        start_date: date(2026, 1, 19),
        end_date: date(2026, 11, 27),
    };
    let trimester = |id: &str, year_id: &str, order: u8, start, end| Trimester {
        trimester_id: id.to_string(),
        school_year_id: year_id.to_string(),
        name: id.to_string(),
        order,
        start_date: start,
        end_date: end,
    };

    // 第二个学期指向不存在的学年，外键失败后学年也不应留下
    let err = repo
        .create_school_year_with_trimesters(
            &year,
            &[
                trimester("a", "sy-2026", 1, date(2026, 1, 19), date(2026, 4, 30)),
                trimester("b", "sy-missing", 2, date(2026, 5, 1), date(2026, 8, 31)),
                trimester("c", "sy-2026", 3, date(2026, 9, 1), date(2026, 11, 27)),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));
    assert!(repo.find_active_school_year_id().unwrap().is_none());
    assert!(repo.list_academic_periods(None).await.unwrap().is_empty());
}

// ==========================================
// InfractionRepository
// ==========================================

#[tokio::test]
async fn test_infraction_primary_key_and_update() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let students = StudentRepository::from_connection(conn.clone());
    let student_id = students
        .find_or_create_student(
            "3314",
            &profile(Some("Ana"), Some("Décimo A"), AcademicLevel::HighSchool),
        )
        .await
        .unwrap();

    let repo = InfractionRepository::from_connection(conn);
    let original = record("h1", &student_id, date(2025, 8, 26));
    repo.create_infraction(&original).await.unwrap();

    let err = repo.create_infraction(&original).await.unwrap_err();
    assert!(err.is_unique_violation());

    let mut edited = original.clone();
    edited.last_editor = Some("Rectoría".to_string());
    edited.detail = Some("citación a acudiente".to_string());
    assert!(repo.update_infraction("h1", &edited).await.unwrap());
    assert!(!repo.update_infraction("h-missing", &edited).await.unwrap());

    let stored = repo.find_infraction_by_hash("h1").await.unwrap().unwrap();
    assert_eq!(stored, edited);
    assert!(repo.find_infraction_by_hash("h2").await.unwrap().is_none());

    repo.create_infraction(&record("h0", &student_id, date(2025, 5, 2)))
        .await
        .unwrap();
    let history = repo.find_by_student_code("3314").unwrap();
    let hashes: Vec<_> = history.iter().map(|r| r.hash.as_str()).collect();
    assert_eq!(hashes, vec!["h0", "h1"]);
    assert_eq!(repo.count_by_trimester(T2).unwrap(), 2);
    assert_eq!(repo.count_by_trimester(T1).unwrap(), 0);
    assert_eq!(repo.count_all().unwrap(), 2);
}

// ==========================================
// ImportBatchRepository
// ==========================================

#[tokio::test]
async fn test_import_batches_newest_first() {
    let (_file, _db_path, conn) = create_seeded_db().unwrap();
    let repo = ImportBatchRepository::from_connection(conn);

    repo.insert(&batch("b-old", 30)).unwrap();
    repo.record_batch(&batch("b-new", 1)).await.unwrap();
    repo.insert(&batch("b-mid", 10)).unwrap();

    let recent = repo.list_recent(2).unwrap();
    let ids: Vec<_> = recent.iter().map(|b| b.batch_id.as_str()).collect();
    assert_eq!(ids, vec!["b-new", "b-mid"]);
    assert_eq!(recent[0].phase, ImportPhase::Preview);
    assert_eq!(recent[0].fault_type, FaultType::TypeI);
    assert_eq!(recent[0].error_rows, 1);
}
