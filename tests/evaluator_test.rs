#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use muil_eval::diagnostics::{DiagnosticSink, VecDiagnosticSink};
    use muil_eval::symbols::{
        ClassMember, ClassMemberKind, ClassSymbol, FunctionKind, FunctionParent, FunctionSymbol,
        Literal, ModuleMember, ModuleMemberKind, ModuleSymbol, Type, VariableSymbol,
        ENTRYPOINT_FUNCTION,
    };
    use muil_eval::{
        evaluate_function, evaluate_module, Args, Block, CatchClause, Expr, Evaluator,
        LocationSymbol, Statement, Unwind,
    };

    fn var(name: &str, ty: Type, default: Option<Literal>, readonly: bool) -> Rc<VariableSymbol> {
        Rc::new(VariableSymbol {
            name: name.to_string(),
            ty,
            default,
            readonly,
        })
    }

    fn build_module(
        name: &str,
        imports: Vec<Rc<ModuleSymbol>>,
        make_members: impl FnOnce(&Rc<ModuleSymbol>) -> Vec<ModuleMember>,
        make_init: impl FnOnce(&Rc<ModuleSymbol>) -> Option<Rc<FunctionSymbol>>,
    ) -> Rc<ModuleSymbol> {
        let module = Rc::new(ModuleSymbol {
            name: name.to_string(),
            imports,
            members: RefCell::new(Vec::new()),
            init: RefCell::new(None),
            pos: None,
        });
        *module.members.borrow_mut() = make_members(&module);
        *module.init.borrow_mut() = make_init(&module);
        module
    }

    fn build_class(
        name: &str,
        parent_module: &Rc<ModuleSymbol>,
        base: Option<Rc<ClassSymbol>>,
        make_members: impl FnOnce(&Rc<ClassSymbol>) -> Vec<ClassMember>,
        make_init: impl FnOnce(&Rc<ClassSymbol>) -> Option<Rc<FunctionSymbol>>,
    ) -> Rc<ClassSymbol> {
        let class = Rc::new(ClassSymbol {
            name: name.to_string(),
            parent_module: Rc::clone(parent_module),
            base: RefCell::new(base),
            members: RefCell::new(Vec::new()),
            init: RefCell::new(None),
            pos: None,
        });
        *class.members.borrow_mut() = make_members(&class);
        *class.init.borrow_mut() = make_init(&class);
        class
    }

    fn module_function(module: &Rc<ModuleSymbol>, name: &str, params: Vec<Rc<VariableSymbol>>, body: Block) -> Rc<FunctionSymbol> {
        Rc::new(FunctionSymbol {
            name: name.to_string(),
            parent: FunctionParent::Module(Rc::clone(module)),
            is_static: false,
            kind: FunctionKind::Plain,
            params,
            return_type: None,
            body: Rc::new(body),
            pos: None,
        })
    }

    fn class_function(
        class: &Rc<ClassSymbol>,
        name: &str,
        is_static: bool,
        kind: FunctionKind,
        params: Vec<Rc<VariableSymbol>>,
        body: Block,
    ) -> Rc<FunctionSymbol> {
        Rc::new(FunctionSymbol {
            name: name.to_string(),
            parent: FunctionParent::Class(Rc::clone(class)),
            is_static,
            kind,
            params,
            return_type: None,
            body: Rc::new(body),
            pos: None,
        })
    }

    fn local(name: &str) -> Expr {
        Expr::LoadLocation {
            object: None,
            symbol: LocationSymbol::Local(name.to_string()),
        }
    }

    fn empty_evaluator(diags: &VecDiagnosticSink) -> Evaluator<'_> {
        Evaluator::new(muil_eval::NOOP_HOOKS, diags)
    }

    // --- Scenario 1: empty program ---------------------------------------

    #[test]
    fn empty_program_produces_no_diagnostics_and_returns_null() {
        let module = build_module(
            "index",
            vec![],
            |m| {
                let f = module_function(m, ENTRYPOINT_FUNCTION, vec![], Block::default());
                vec![ModuleMember {
                    name: ENTRYPOINT_FUNCTION.to_string(),
                    kind: ModuleMemberKind::Function(f),
                }]
            },
            |_| None,
        );

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let result = evaluate_module(&evaluator, &module, &Args::new()).expect("empty program evaluates cleanly");
        assert!(result.is_null());
        assert_eq!(diags.errors(), 0);
        assert_eq!(diags.warnings(), 0);
    }

    // --- Scenario 2: static class init runs once, then readonly freezes --

    #[test]
    fn static_class_init_runs_once_and_freezes_readonly_statics() {
        let module = build_module("m", vec![], |_| vec![], |_| None);

        let class = build_class(
            "C",
            &module,
            None,
            |c| {
                vec![ClassMember {
                    name: "x".to_string(),
                    is_static: true,
                    kind: ClassMemberKind::Variable(var("x", Type::Number, Some(Literal::Number(1.0)), true)),
                }]
            },
            |c| {
                // static init { x = 2 }
                let body = Block {
                    statements: vec![Statement::Expression(Expr::Assign {
                        target: Box::new(Expr::LoadLocation {
                            object: None,
                            symbol: LocationSymbol::Member(muil_eval::symbols::Symbol::ClassMember {
                                class: Rc::clone(c),
                                name: "x".to_string(),
                            }),
                        }),
                        op: None,
                        value: Box::new(Expr::Number(2.0)),
                    })],
                };
                Some(class_function(c, "init", true, FunctionKind::Plain, vec![], body))
            },
        );

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);

        let statics = evaluator.ensure_class_init(&class).expect("class init succeeds");
        assert_eq!(statics.properties().get_addr("x").unwrap().get().as_number(), Some(2.0));

        // A second ensure_class_init must not rerun the initializer.
        let again = evaluator.ensure_class_init(&class).expect("idempotent");
        assert!(again.identity_eq(&statics));

        // x was declared readonly, so the post-init freeze rejects further writes.
        let ptr = statics.properties().get_addr("x").unwrap();
        assert!(ptr.is_readonly());
    }

    // --- Scenario 3: named-argument function call -------------------------

    #[test]
    fn named_argument_call_adds_one() {
        let module = build_module(
            "m",
            vec![],
            |m| {
                let body = Block {
                    statements: vec![Statement::Return {
                        value: Some(Expr::Binary {
                            op: muil_eval::BinaryOp::Add,
                            left: Box::new(local("a")),
                            right: Box::new(Expr::Number(1.0)),
                        }),
                    }],
                };
                let f = module_function(m, "f", vec![var("a", Type::Number, None, false)], body);
                vec![ModuleMember {
                    name: "f".to_string(),
                    kind: ModuleMemberKind::Function(f),
                }]
            },
            |_| None,
        );

        let f = match module.member("f").unwrap() {
            ModuleMemberKind::Function(f) => f,
            _ => unreachable!(),
        };

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);

        let mut args = Args::new();
        args.insert("a".to_string(), Literal::Number(41.0));

        let result = evaluate_function(&evaluator, &f, None, &args).expect("call succeeds");
        assert_eq!(result.as_number(), Some(42.0));
        assert_eq!(diags.errors(), 0);
    }

    #[test]
    fn named_argument_call_reports_missing_and_unknown_arguments_as_diagnostics() {
        let module = build_module(
            "m",
            vec![],
            |m| {
                let f = module_function(m, "f", vec![var("a", Type::Number, None, false)], Block::default());
                vec![ModuleMember {
                    name: "f".to_string(),
                    kind: ModuleMemberKind::Function(f),
                }]
            },
            |_| None,
        );
        let f = match module.member("f").unwrap() {
            ModuleMemberKind::Function(f) => f,
            _ => unreachable!(),
        };

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);

        let mut args = Args::new();
        args.insert("b".to_string(), Literal::Number(1.0));

        let err = evaluate_function(&evaluator, &f, None, &args).unwrap_err();
        assert!(matches!(err, muil_eval::Error::Diagnostics(n) if n >= 1));
        assert!(diags.errors() >= 2); // missing 'a' and unknown 'b'
    }

    // --- Scenario 4: try/catch/finally ordering ----------------------------

    fn try_catch_module(finally: Option<Block>) -> Rc<ModuleSymbol> {
        let catch_param = var("e", Type::String, None, false);
        let try_stmt = Statement::TryCatchFinally {
            try_block: Block {
                statements: vec![Statement::Throw {
                    value: Expr::String("boom".to_string()),
                }],
            },
            catches: vec![CatchClause {
                param: Some(catch_param),
                block: Block {
                    statements: vec![Statement::Return {
                        value: Some(local("e")),
                    }],
                },
            }],
            finally_block: finally,
        };
        let body = Block {
            statements: vec![try_stmt],
        };

        build_module(
            "m",
            vec![],
            |m| {
                let f = module_function(m, ENTRYPOINT_FUNCTION, vec![], body);
                vec![ModuleMember {
                    name: ENTRYPOINT_FUNCTION.to_string(),
                    kind: ModuleMemberKind::Function(f),
                }]
            },
            |_| None,
        )
    }

    #[test]
    fn catch_binds_the_thrown_value_and_returns_it() {
        let module = try_catch_module(None);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let result = evaluate_module(&evaluator, &module, &Args::new()).expect("caught, not unhandled");
        assert_eq!(result.as_string().map(|s| s.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn finally_return_overrides_the_catch_return() {
        let finally = Block {
            statements: vec![Statement::Return {
                value: Some(Expr::String("done".to_string())),
            }],
        };
        let module = try_catch_module(Some(finally));
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let result = evaluate_module(&evaluator, &module, &Args::new()).expect("evaluates cleanly");
        assert_eq!(result.as_string().map(|s| s.to_string()), Some("done".to_string()));
    }

    // --- Scenario 5: dynamic array growth -----------------------------------

    #[test]
    fn writing_past_the_end_of_an_array_fills_intermediate_slots_with_null() {
        let var_a = var("a", Type::Array(Rc::new(Type::Dynamic)), None, false);
        let body = Block {
            statements: vec![
                Statement::LocalVariableDeclaration {
                    var: Rc::clone(&var_a),
                    initializer: Some(Expr::Array {
                        element_type: Type::Dynamic,
                        size: Some(Box::new(Expr::Number(3.0))),
                        elements: vec![],
                    }),
                },
                Statement::Expression(Expr::Assign {
                    target: Box::new(Expr::LoadDynamic {
                        object: Box::new(local("a")),
                        name: Box::new(Expr::Number(5.0)),
                    }),
                    op: None,
                    value: Box::new(Expr::String("x".to_string())),
                }),
                Statement::Return {
                    value: Some(local("a")),
                },
            ],
        };

        let module = build_module(
            "m",
            vec![],
            |m| {
                let f = module_function(m, ENTRYPOINT_FUNCTION, vec![], body);
                vec![ModuleMember {
                    name: ENTRYPOINT_FUNCTION.to_string(),
                    kind: ModuleMemberKind::Function(f),
                }]
            },
            |_| None,
        );

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let arr = evaluate_module(&evaluator, &module, &Args::new()).expect("evaluates cleanly");

        assert!(arr.array_len().unwrap() >= 6);
        assert!(arr.array_get(4).unwrap().get().is_null());
        assert_eq!(arr.array_get(5).unwrap().get().as_string().map(|s| s.to_string()), Some("x".to_string()));
    }

    // --- Scenario 6: diamond import module-init ordering --------------------

    #[test]
    fn diamond_import_initializes_each_module_exactly_once_in_dependency_order() {
        let log: Rc<RefCell<Vec<String>>> = Rc::new(RefCell::new(Vec::new()));

        struct RecordingHooks {
            log: Rc<RefCell<Vec<String>>>,
        }
        impl muil_eval::Hooks for RecordingHooks {
            // `on_leave_module` fires once a module's own globals are fully
            // populated, which -- unlike `on_enter_module`, fired on first
            // encounter before imports are even walked -- happens in true
            // dependency order: every import has already left by the time
            // its importer does.
            fn on_leave_module(&self, module: &Rc<ModuleSymbol>) {
                self.log.borrow_mut().push(module.name.clone());
            }
        }

        let d = build_module("D", vec![], |_| vec![], |_| None);
        let b = build_module("B", vec![Rc::clone(&d)], |_| vec![], |_| None);
        let c = build_module("C", vec![Rc::clone(&d)], |_| vec![], |_| None);
        let a = build_module("A", vec![Rc::clone(&b), Rc::clone(&c)], |_| vec![], |_| None);

        let diags = VecDiagnosticSink::new();
        let hooks = RecordingHooks { log: Rc::clone(&log) };
        let evaluator = Evaluator::new(&hooks, &diags);

        evaluator.ensure_module_init(&a).expect("module init succeeds");

        let order = log.borrow().clone();
        assert_eq!(order, vec!["D".to_string(), "B".to_string(), "C".to_string(), "A".to_string()]);
    }

    // --- Quantified invariants ------------------------------------------

    #[test]
    fn call_depth_returns_to_zero_whether_the_call_returns_or_throws() {
        let module = build_module("m", vec![], |_| vec![], |_| None);

        let ok_body = Block {
            statements: vec![Statement::Return {
                value: Some(Expr::Number(1.0)),
            }],
        };
        let throw_body = Block {
            statements: vec![Statement::Throw {
                value: Expr::String("x".to_string()),
            }],
        };

        let ok_fn = module_function(&module, "ok", vec![], ok_body);
        let throw_fn = module_function(&module, "boom", vec![], throw_body);

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);

        evaluator.invoke(&ok_fn, None, vec![], None).expect("returns");
        assert_eq!(evaluator.call_depth(), 0);

        let err = evaluator.invoke(&throw_fn, None, vec![], None).unwrap_err();
        assert!(matches!(err, Unwind::Throw(_)));
        assert_eq!(evaluator.call_depth(), 0);
    }

    #[test]
    fn each_new_produces_a_distinct_this_not_shared_across_instances() {
        let class_cell: Rc<RefCell<Option<Rc<ClassSymbol>>>> = Rc::new(RefCell::new(None));
        let class_cell2 = Rc::clone(&class_cell);

        let module = build_module(
            "m",
            vec![],
            move |m| {
                let class = build_class(
                    "C",
                    m,
                    None,
                    |c| {
                        vec![ClassMember {
                            name: "constructor".to_string(),
                            is_static: false,
                            kind: ClassMemberKind::Function(class_function(
                                c,
                                "constructor",
                                false,
                                FunctionKind::Constructor,
                                vec![],
                                Block::default(),
                            )),
                        }]
                    },
                    |_| None,
                );
                *class_cell2.borrow_mut() = Some(Rc::clone(&class));

                let var_x = var("x", Type::Class(Rc::clone(&class)), None, false);
                let var_y = var("y", Type::Class(Rc::clone(&class)), None, false);
                let new_instance = || Expr::New {
                    ty: Type::Class(Rc::clone(&class)),
                    args: vec![],
                };
                let body = Block {
                    statements: vec![
                        Statement::LocalVariableDeclaration {
                            var: Rc::clone(&var_x),
                            initializer: Some(new_instance()),
                        },
                        Statement::LocalVariableDeclaration {
                            var: Rc::clone(&var_y),
                            initializer: Some(new_instance()),
                        },
                        Statement::Return {
                            value: Some(Expr::Unary {
                                op: muil_eval::UnaryOp::Not,
                                operand: Box::new(Expr::Binary {
                                    op: muil_eval::BinaryOp::EqEq,
                                    left: Box::new(local("x")),
                                    right: Box::new(local("y")),
                                }),
                            }),
                        },
                    ],
                };
                let entry = module_function(m, ENTRYPOINT_FUNCTION, vec![], body);
                vec![
                    ModuleMember {
                        name: ENTRYPOINT_FUNCTION.to_string(),
                        kind: ModuleMemberKind::Function(entry),
                    },
                    ModuleMember {
                        name: "C".to_string(),
                        kind: ModuleMemberKind::Class(class),
                    },
                ]
            },
            |_| None,
        );

        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let result = evaluate_module(&evaluator, &module, &Args::new()).expect("evaluates cleanly");
        assert_eq!(result.as_bool(), Some(true), "two `new C()` instances must not be identity-equal");
        assert!(class_cell.borrow().is_some());
    }

    // --- Boundaries --------------------------------------------------------

    fn entrypoint_throwing(expr_body: Block) -> Rc<ModuleSymbol> {
        build_module(
            "m",
            vec![],
            |m| {
                let f = module_function(m, ENTRYPOINT_FUNCTION, vec![], expr_body);
                vec![ModuleMember {
                    name: ENTRYPOINT_FUNCTION.to_string(),
                    kind: ModuleMemberKind::Function(f),
                }]
            },
            |_| None,
        )
    }

    #[test]
    fn negative_array_literal_size_throws_negative_array_length() {
        let body = Block {
            statements: vec![Statement::Expression(Expr::Array {
                element_type: Type::Dynamic,
                size: Some(Box::new(Expr::Number(-1.0))),
                elements: vec![],
            })],
        };
        let module = entrypoint_throwing(body);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let err = evaluate_module(&evaluator, &module, &Args::new()).unwrap_err();
        match err {
            muil_eval::Error::Unhandled(message) => {
                assert!(message.contains("array size cannot be negative"));
            }
            other => panic!("expected an unhandled NegativeArrayLength exception, got {other:?}"),
        }
    }

    #[test]
    fn array_literal_with_fewer_elements_than_size_pads_the_remainder_with_null() {
        // `new number[3]{1, 2}` is legal -- the declared size only bounds the
        // element count from above, it does not require an exact match.
        let body = Block {
            statements: vec![Statement::Return {
                value: Some(Expr::Array {
                    element_type: Type::Number,
                    size: Some(Box::new(Expr::Number(3.0))),
                    elements: vec![Expr::Number(1.0), Expr::Number(2.0)],
                }),
            }],
        };
        let module = entrypoint_throwing(body);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let arr = evaluate_module(&evaluator, &module, &Args::new()).expect("evaluates cleanly");

        assert_eq!(arr.array_len(), Some(3));
        assert_eq!(arr.array_get(0).unwrap().get().as_number(), Some(1.0));
        assert_eq!(arr.array_get(1).unwrap().get().as_number(), Some(2.0));
        assert!(arr.array_get(2).unwrap().get().is_null());
    }

    #[test]
    fn array_literal_with_more_elements_than_size_throws() {
        let body = Block {
            statements: vec![Statement::Expression(Expr::Array {
                element_type: Type::Number,
                size: Some(Box::new(Expr::Number(1.0))),
                elements: vec![Expr::Number(1.0), Expr::Number(2.0)],
            })],
        };
        let module = entrypoint_throwing(body);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let err = evaluate_module(&evaluator, &module, &Args::new()).unwrap_err();
        match err {
            muil_eval::Error::Unhandled(message) => {
                assert!(message.contains("incorrect number of elements"));
            }
            other => panic!("expected an unhandled IncorrectArrayElementCount exception, got {other:?}"),
        }
    }

    #[test]
    fn accessing_a_property_on_null_throws_null_object() {
        let body = Block {
            statements: vec![Statement::Expression(Expr::LoadDynamic {
                object: Box::new(Expr::Null),
                name: Box::new(Expr::String("x".to_string())),
            })],
        };
        let module = entrypoint_throwing(body);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let err = evaluate_module(&evaluator, &module, &Args::new()).unwrap_err();
        match err {
            muil_eval::Error::Unhandled(message) => {
                assert!(message.contains("object reference not set to an instance of an object"));
            }
            other => panic!("expected an unhandled NullObject exception, got {other:?}"),
        }
    }

    #[test]
    fn invoking_null_as_a_function_throws_null_object() {
        let body = Block {
            statements: vec![Statement::Expression(Expr::Invoke {
                function: Box::new(Expr::Null),
                args: vec![],
            })],
        };
        let module = entrypoint_throwing(body);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let err = evaluate_module(&evaluator, &module, &Args::new()).unwrap_err();
        match err {
            muil_eval::Error::Unhandled(message) => {
                assert!(message.contains("object reference not set to an instance of an object"));
            }
            other => panic!("expected an unhandled NullObject exception, got {other:?}"),
        }
    }

    #[test]
    fn cast_to_an_incompatible_type_throws_invalid_cast() {
        let body = Block {
            statements: vec![Statement::Expression(Expr::Cast {
                ty: Type::String,
                operand: Box::new(Expr::Number(1.0)),
            })],
        };
        let module = entrypoint_throwing(body);
        let diags = VecDiagnosticSink::new();
        let evaluator = empty_evaluator(&diags);
        let err = evaluate_module(&evaluator, &module, &Args::new()).unwrap_err();
        match err {
            muil_eval::Error::Unhandled(message) => {
                assert!(message.contains("unable to cast"));
            }
            other => panic!("expected an unhandled InvalidCast exception, got {other:?}"),
        }
    }
}
