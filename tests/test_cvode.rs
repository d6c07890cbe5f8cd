use sundials_tutorials::{Context, Error, cvode::{CVode, CVStatus}, problem};

fn rhs(_: f64, u: &[f64; 2], du: &mut [f64; 2]) {
    problem::rhs(u, du)
}

fn max_error(ys: &[(f64, [f64; 2])]) -> f64 {
    ys.iter().map(|(t, y)| {
        let e = problem::exact(*t);
        (y[0] - e[0]).abs().max((y[1] - e[1]).abs())
    }).fold(0., f64::max)
}

#[test]
fn dense_and_spgmr_agree() -> Result<(), Error> {
    let s = problem::Settings { t_end: 10., ..Default::default() };

    let mut dense = CVode::bdf(Context::new()?, s.t0, &s.y0, rhs)?
        .tolerances(1e-8, 1e-10)?
        .jacobian(|_, _, _, j| problem::jacobian(j))?;
    let mut spgmr = CVode::bdf(Context::new()?, s.t0, &s.y0, rhs)?
        .tolerances(1e-8, 1e-10)?
        .spgmr(s.maxl)?;
    let mut yd = Vec::new();
    let mut ys = Vec::new();
    for t in s.output_times() {
        let (u, st) = dense.solution(t);
        st.check("CVode")?;
        yd.push((t, u));
        let (u, st) = spgmr.solution(t);
        st.check("CVode")?;
        ys.push((t, u));
    }
    assert_eq!(yd.len(), 20);
    assert!(max_error(&yd) < 1e-6, "dense: {:e}", max_error(&yd));
    assert!(max_error(&ys) < 1e-6, "SPGMR: {:e}", max_error(&ys));

    let st = dense.stats()?;
    assert!(st.steps > 0 && st.rhs_evals >= st.steps);
    assert_eq!(st.lin_iters, 0);
    let st = spgmr.stats()?;
    assert!(st.lin_iters > 0);
    assert_eq!(st.jac_evals, 0);
    assert!(st.current_time >= 10.);
    Ok(())
}

#[test]
fn too_much_work_is_an_error() {
    let ctx = Context::new().unwrap();
    let mut ode = CVode::adams(ctx, 0., &[2., 1.], rhs).unwrap()
        .mxsteps(5).unwrap();
    let (_, st) = ode.solution(50.);
    assert_eq!(st, CVStatus::TooMuchWork);
    match st.check("CVode") {
        Err(e @ Error::Status { name: "CVode", .. }) => {
            assert_eq!(e.to_string(),
                       "SUNDIALS_ERROR: CVode() failed with status TooMuchWork");
        }
        r => panic!("Status error expected, got {:?}", r),
    }
}

#[test]
fn stop_time() {
    let ctx = Context::new().unwrap();
    let mut ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap();
    ode.set_tstop(0.25).unwrap();
    let (u, st) = ode.solution(1.);
    assert_eq!(st, CVStatus::Tstop(0.25));
    assert!(st.check("CVode").is_ok());
    assert!((u[1] - problem::exact(0.25)[1]).abs() < 1e-4);
}

#[test]
fn one_step_at_a_time() {
    let ctx = Context::new().unwrap();
    let mut ode = CVode::bdf(ctx, 0., &[2., 1.], rhs).unwrap();
    let mut y = [f64::NAN; 2];
    assert_eq!(ode.step(1., &mut y), CVStatus::Ok);
    let t1 = ode.time();
    assert!(0. < t1 && t1 < 1.);
    assert_eq!(ode.step(1., &mut y), CVStatus::Ok);
    assert!(ode.time() > t1);
    assert_eq!(ode.stats().unwrap().steps, 2);
}
